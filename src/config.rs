use clap::{Arg, ArgAction, ArgMatches, Command, value_parser};
use lettre::Address;
use log::Level;
use url::Url;

use crate::core::GenericResult;

pub struct Config {
    pub metrics_url: Url,
    pub smtp_host: String,
    pub smtp_port: u16,
    pub report: ReportConfig,
    pub log_level: Level,
}

/// What to report and to whom.
#[derive(Clone, Debug)]
pub struct ReportConfig {
    pub metric_name: String,
    pub metric_namespace: String,
    pub metric_dimension: String,
    pub email_source: Address,
    pub email_target: Address,
}

pub fn parse_args() -> GenericResult<Config> {
    let matches = command().get_matches();
    parse_matches(&matches)
}

fn command() -> Command {
    Command::new(env!("CARGO_PKG_NAME"))
        .version(env!("CARGO_PKG_VERSION"))

        .dont_collapse_args_in_usage(true)
        .disable_help_subcommand(true)
        .help_expected(true)

        .args([
            Arg::new("verbose")
                .short('v').long("verbose")
                .action(ArgAction::Count)
                .help("Set verbosity level"),

            Arg::new("metrics_url")
                .long("metrics-url").env("METRICS_URL")
                .value_name("URL")
                .required(true)
                .value_parser(value_parser!(Url))
                .help("VictoriaMetrics URL"),

            Arg::new("metric_name")
                .long("metric-name").env("METRIC_NAME")
                .value_name("NAME")
                .required(true)
                .help("Healthcheck metric name"),

            Arg::new("metric_namespace")
                .long("metric-namespace").env("METRIC_NAMESPACE")
                .value_name("NAMESPACE")
                .required(true)
                .help("Healthcheck metric namespace"),

            Arg::new("metric_dimension")
                .long("metric-dimension").env("METRIC_DIMENSION")
                .value_name("TARGET")
                .required(true)
                .help("Healthcheck target to report on"),

            Arg::new("email_source")
                .long("email-source").env("EMAIL_SOURCE")
                .value_name("ADDRESS")
                .required(true)
                .value_parser(value_parser!(Address))
                .help("Report sender address"),

            Arg::new("email_target")
                .long("email-target").env("EMAIL_TARGET")
                .value_name("ADDRESS")
                .required(true)
                .value_parser(value_parser!(Address))
                .help("Report recipient address"),

            Arg::new("smtp_host")
                .long("smtp-host").env("SMTP_HOST")
                .value_name("HOST")
                .required(true)
                .help("SMTP relay to send the report through"),

            Arg::new("smtp_port")
                .long("smtp-port").env("SMTP_PORT")
                .value_name("PORT")
                .default_value("587")
                .value_parser(value_parser!(u16))
                .help("SMTP relay port"),
        ])
}

fn parse_matches(matches: &ArgMatches) -> GenericResult<Config> {
    let log_level = match matches.get_count("verbose") {
        0 => Level::Info,
        1 => Level::Debug,
        2 => Level::Trace,
        _ => return Err!("Invalid verbosity level"),
    };

    let string = |name: &str| -> GenericResult<String> {
        let value: &String = matches.get_one(name).ok_or_else(|| format!("{name} is not specified"))?;
        if value.trim().is_empty() {
            return Err!("{name} must not be empty");
        }
        Ok(value.clone())
    };

    let address = |name: &str| -> GenericResult<Address> {
        Ok(matches.get_one::<Address>(name).cloned().ok_or_else(|| format!("{name} is not specified"))?)
    };

    Ok(Config {
        metrics_url: matches.get_one::<Url>("metrics_url").cloned().ok_or("metrics_url is not specified")?,
        smtp_host: string("smtp_host")?,
        smtp_port: matches.get_one::<u16>("smtp_port").copied().unwrap_or(587),
        report: ReportConfig {
            metric_name: string("metric_name")?,
            metric_namespace: string("metric_namespace")?,
            metric_dimension: string("metric_dimension")?,
            email_source: address("email_source")?,
            email_target: address("email_target")?,
        },
        log_level,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const REQUIRED: [(&str, &str); 7] = [
        ("--metrics-url", "http://localhost:8428"),
        ("--metric-name", "healthcheck_status"),
        ("--metric-namespace", "Healthchecks"),
        ("--metric-dimension", "example.com"),
        ("--email-source", "reports@example.com"),
        ("--email-target", "ops@example.com"),
        ("--smtp-host", "smtp.example.com"),
    ];

    fn parse(overrides: &[(&str, &str)], flags: &[&str]) -> GenericResult<Config> {
        let mut args = vec!["healthcheck-report"];

        for (name, value) in REQUIRED {
            let value = overrides.iter()
                .find(|(overridden, _)| *overridden == name)
                .map_or(value, |&(_, value)| value);
            args.extend([name, value]);
        }
        args.extend(flags);

        let matches = command().try_get_matches_from(args)?;
        parse_matches(&matches)
    }

    #[test]
    fn command_is_valid() {
        command().debug_assert();
    }

    #[test]
    fn defaults() {
        let config = parse(&[], &[]).unwrap();
        assert_eq!(config.metrics_url.as_str(), "http://localhost:8428/");
        assert_eq!(config.smtp_port, 587);
        assert_eq!(config.log_level, Level::Info);
        assert_eq!(config.report.metric_dimension, "example.com");
        assert_eq!(config.report.email_target.to_string(), "ops@example.com");
    }

    #[test]
    fn verbosity() {
        assert_eq!(parse(&[], &["-vv"]).unwrap().log_level, Level::Trace);
        assert!(parse(&[], &["-vvv"]).is_err());
    }

    #[test]
    fn invalid_values() {
        assert!(parse(&[("--email-target", "not an address")], &[]).is_err());
        assert!(parse(&[("--metric-dimension", " ")], &[]).is_err());
        assert!(parse(&[], &["--smtp-port", "70000"]).is_err());
    }
}
