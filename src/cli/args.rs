//! Command-line argument parsing for the demo binary.

/// Parsed CLI command to execute.
#[derive(Debug, Clone, PartialEq)]
pub enum CliCommand {
    /// Show version information
    Version,
    /// Show usage
    Help,
    /// Store a refresh secret and check it against the token endpoint
    Login { secret: String },
    /// Remove the stored refresh secret
    Logout,
    /// Obtain an access token and report its expiry
    Token,
    Limits,
    Portfolio,
    /// Stream last candles for one instrument until Ctrl-C
    Watch {
        class_code: String,
        ticker: String,
        time_frame: String,
    },
    /// Unusable arguments, with the reason
    Invalid(String),
}

pub const DEFAULT_TIME_FRAME: &str = "M1";

pub const USAGE: &str = "\
Usage: bcs-trade <command>

Commands:
  login <REFRESH_SECRET>               store the refresh secret
  logout                               remove the stored refresh secret
  token                                check that an access token can be issued
  limits                               print account limits
  portfolio                            print the portfolio
  watch <CLASS> <TICKER> [TIMEFRAME]   stream last candles (default M1)

Options:
  -h, --help       show this message
  -V, --version    show version";

/// Parse command-line arguments, skipping the program name.
///
/// # Examples
///
/// ```
/// use bcs_trade::cli::args::{parse_args, CliCommand};
///
/// let args = vec!["bcs-trade".to_string(), "--version".to_string()];
/// assert_eq!(parse_args(args.into_iter()), CliCommand::Version);
/// ```
pub fn parse_args<I>(args: I) -> CliCommand
where
    I: Iterator<Item = String>,
{
    let args: Vec<String> = args.skip(1).collect();
    let Some(command) = args.first() else {
        return CliCommand::Help;
    };
    let rest = &args[1..];

    match command.as_str() {
        "--version" | "-V" => CliCommand::Version,
        "--help" | "-h" | "help" => CliCommand::Help,
        "login" => match rest {
            [secret] => CliCommand::Login {
                secret: secret.clone(),
            },
            _ => CliCommand::Invalid("login expects exactly one refresh secret".to_string()),
        },
        "logout" => CliCommand::Logout,
        "token" => CliCommand::Token,
        "limits" => CliCommand::Limits,
        "portfolio" => CliCommand::Portfolio,
        "watch" => match rest {
            [class_code, ticker] => CliCommand::Watch {
                class_code: class_code.clone(),
                ticker: ticker.clone(),
                time_frame: DEFAULT_TIME_FRAME.to_string(),
            },
            [class_code, ticker, time_frame] => CliCommand::Watch {
                class_code: class_code.clone(),
                ticker: ticker.clone(),
                time_frame: time_frame.clone(),
            },
            _ => CliCommand::Invalid("watch expects <CLASS> <TICKER> [TIMEFRAME]".to_string()),
        },
        other => CliCommand::Invalid(format!("unknown command '{}'", other)),
    }
}
