use anyhow::{bail, Context};

/// Operator commands read from stdin, one per line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    Show,
    Set { field: String, value: String },
    Add(String),
    Remove(String),
    Load,
    Save,
    Start,
    Stop,
    Backtest(Option<u32>),
    Test,
    Status,
    Chart,
    Stats,
    Trades,
    Quit,
}

pub const HELP: &str = "\
Commands:
  show                    current configuration, mode and advisories
  set <field> <value>     edit one field (e.g. `set risk 2.5`, `set symbols BTC/USDT,ETH/USDT`)
  add <pair>              add a pair (enables multi-pair mode)
  remove <pair>           remove a pair
  load                    reload configuration from the engine
  save                    send configuration to the engine
  start                   start the engine in the current mode
  stop                    stop the engine
  backtest [years]        run a backtest (default 1 year)
  test                    test exchange credentials
  status                  engine status and balance
  chart                   price chart with moving averages and trades
  stats                   performance statistics
  trades                  recent trades
  quit                    exit";

/// Parse one input line. Blank lines yield `None`.
pub fn parse(line: &str) -> anyhow::Result<Option<Command>> {
    let mut words = line.split_whitespace();
    let Some(verb) = words.next() else {
        return Ok(None);
    };
    let rest: Vec<&str> = words.collect();

    let cmd = match verb.to_lowercase().as_str() {
        "help" | "?" => Command::Help,
        "show" | "config" => Command::Show,
        "set" => {
            let Some((field, value)) = rest.split_first() else {
                bail!("usage: set <field> <value>");
            };
            if value.is_empty() {
                bail!("usage: set {field} <value>");
            }
            Command::Set {
                field: field.to_string(),
                value: value.join(" "),
            }
        }
        "add" => Command::Add(single_arg("add <pair>", &rest)?),
        "remove" | "rm" => Command::Remove(single_arg("remove <pair>", &rest)?),
        "load" => Command::Load,
        "save" => Command::Save,
        "start" => Command::Start,
        "stop" => Command::Stop,
        "backtest" => Command::Backtest(match rest.as_slice() {
            [] => None,
            [years] => Some(
                years
                    .parse()
                    .with_context(|| format!("years must be a whole number, got '{years}'"))?,
            ),
            _ => bail!("usage: backtest [years]"),
        }),
        "test" => Command::Test,
        "status" => Command::Status,
        "chart" => Command::Chart,
        "stats" => Command::Stats,
        "trades" => Command::Trades,
        "quit" | "exit" | "q" => Command::Quit,
        other => bail!("unknown command '{other}' (try `help`)"),
    };
    Ok(Some(cmd))
}

fn single_arg(usage: &str, rest: &[&str]) -> anyhow::Result<String> {
    match rest {
        [one] => Ok(one.to_string()),
        _ => bail!("usage: {usage}"),
    }
}
