use alloy::primitives::{Address, B256};
use std::str::FromStr;

const USAGE: &str = "usage: fhe-mailbox <inbox <addr> | sent <addr> | message <id> | by-tx <hash> | check> [--mock]";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Inbox { address: Address, use_mock: bool },
    Sent { address: Address, use_mock: bool },
    Message { id: u64, use_mock: bool },
    ByTx { tx_hash: B256 },
    Check,
}

impl Command {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Inbox { .. } => "inbox",
            Self::Sent { .. } => "sent",
            Self::Message { .. } => "message",
            Self::ByTx { .. } => "by-tx",
            Self::Check => "check",
        }
    }
}

fn parse_bool_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn mock_default_from_env() -> bool {
    std::env::var("MAILBOX_USE_MOCK")
        .ok()
        .and_then(|raw| parse_bool_flag(&raw))
        .unwrap_or(false)
}

fn parse_address(raw: &str) -> anyhow::Result<Address> {
    Address::from_str(raw.trim()).map_err(|err| {
        anyhow::anyhow!("invalid address '{}': {} (expected 0x-prefixed 20-byte hex)", raw, err)
    })
}

fn parse_command_from_iter<I, S>(args: I) -> anyhow::Result<Command>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut use_mock = mock_default_from_env();
    let mut positional = Vec::new();
    for arg in args {
        let arg = arg.as_ref();
        if arg == "--mock" {
            use_mock = true;
        } else if let Some(value) = arg.strip_prefix("--mock=") {
            use_mock = parse_bool_flag(value)
                .ok_or_else(|| anyhow::anyhow!("invalid --mock value '{}'", value))?;
        } else if arg.starts_with("--") {
            return Err(anyhow::anyhow!("unknown flag '{}'\n{}", arg, USAGE));
        } else {
            positional.push(arg.to_string());
        }
    }

    let mut positional = positional.into_iter();
    let verb = positional
        .next()
        .ok_or_else(|| anyhow::anyhow!("missing command\n{}", USAGE))?;
    let operand = positional.next();
    if let Some(extra) = positional.next() {
        return Err(anyhow::anyhow!("unexpected argument '{}'\n{}", extra, USAGE));
    }
    let require = |what: &str| {
        operand
            .clone()
            .ok_or_else(|| anyhow::anyhow!("`{}` needs {}\n{}", verb, what, USAGE))
    };

    let command = match verb.as_str() {
        "inbox" => Command::Inbox {
            address: parse_address(&require("an address")?)?,
            use_mock,
        },
        "sent" => Command::Sent {
            address: parse_address(&require("an address")?)?,
            use_mock,
        },
        "message" => {
            let raw = require("a mail id")?;
            let id = raw
                .trim()
                .parse::<u64>()
                .map_err(|err| anyhow::anyhow!("invalid mail id '{}': {}", raw, err))?;
            Command::Message { id, use_mock }
        }
        "by-tx" => {
            let raw = require("a transaction hash")?;
            let tx_hash = B256::from_str(raw.trim())
                .map_err(|err| anyhow::anyhow!("invalid transaction hash '{}': {}", raw, err))?;
            Command::ByTx { tx_hash }
        }
        "check" => {
            if let Some(extra) = operand {
                return Err(anyhow::anyhow!("unexpected argument '{}'\n{}", extra, USAGE));
            }
            Command::Check
        }
        other => return Err(anyhow::anyhow!("unknown command '{}'\n{}", other, USAGE)),
    };
    Ok(command)
}

pub fn parse_command() -> anyhow::Result<Command> {
    parse_command_from_iter(std::env::args().skip(1))
}

#[cfg(test)]
mod tests {
    use super::{parse_command_from_iter, Command};
    use alloy::primitives::{Address, B256};
    use std::str::FromStr;
    use std::sync::{Mutex, OnceLock};

    fn env_lock() -> &'static Mutex<()> {
        static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
        LOCK.get_or_init(|| Mutex::new(()))
    }

    const DEAD: &str = "0x000000000000000000000000000000000000dEaD";

    #[test]
    fn command_parses_inbox_with_mock_flag() {
        let _guard = env_lock().lock().expect("env lock");
        std::env::remove_var("MAILBOX_USE_MOCK");
        let parsed = parse_command_from_iter(["inbox", DEAD, "--mock"]).expect("parse");
        assert_eq!(
            parsed,
            Command::Inbox {
                address: Address::from_str(DEAD).expect("valid address"),
                use_mock: true,
            }
        );
    }

    #[test]
    fn command_mock_default_comes_from_env() {
        let _guard = env_lock().lock().expect("env lock");
        std::env::set_var("MAILBOX_USE_MOCK", "yes");
        let parsed = parse_command_from_iter(["sent", DEAD]).expect("parse");
        assert!(matches!(parsed, Command::Sent { use_mock: true, .. }));
        let parsed = parse_command_from_iter(["sent", DEAD, "--mock=false"]).expect("parse");
        assert!(matches!(parsed, Command::Sent { use_mock: false, .. }));
        std::env::remove_var("MAILBOX_USE_MOCK");
    }

    #[test]
    fn command_parses_message_by_tx_and_check() {
        let _guard = env_lock().lock().expect("env lock");
        std::env::remove_var("MAILBOX_USE_MOCK");
        assert_eq!(
            parse_command_from_iter(["message", "42"]).expect("parse"),
            Command::Message {
                id: 42,
                use_mock: false
            }
        );
        let hash = format!("{:#x}", B256::repeat_byte(0x5a));
        assert_eq!(
            parse_command_from_iter(["by-tx", hash.as_str()]).expect("parse"),
            Command::ByTx {
                tx_hash: B256::repeat_byte(0x5a)
            }
        );
        assert_eq!(
            parse_command_from_iter(["check"]).expect("parse"),
            Command::Check
        );
    }

    #[test]
    fn check_takes_no_operand() {
        let _guard = env_lock().lock().expect("env lock");
        std::env::remove_var("MAILBOX_USE_MOCK");
        let err = parse_command_from_iter(["check", "extra"]).expect_err("operand rejected");
        assert!(err.to_string().contains("unexpected argument 'extra'"), "{err}");
        assert_eq!(
            parse_command_from_iter(["check", "--mock"]).expect("parse"),
            Command::Check
        );
    }

    #[test]
    fn command_rejects_bad_input() {
        let _guard = env_lock().lock().expect("env lock");
        std::env::remove_var("MAILBOX_USE_MOCK");
        for args in [
            vec![],
            vec!["inbox"],
            vec!["inbox", "not-an-address"],
            vec!["message", "-1"],
            vec!["by-tx", "0x1234"],
            vec!["launch"],
            vec!["check", "extra"],
            vec!["check", "--verbose"],
        ] {
            assert!(
                parse_command_from_iter(args.clone()).is_err(),
                "expected failure for {args:?}"
            );
        }
    }
}
