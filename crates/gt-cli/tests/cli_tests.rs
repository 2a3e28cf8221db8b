use gt_cli::{Cli, Commands, Parser};
use std::path::PathBuf;

#[test]
fn test_cli_parsing_peek() {
    let cli = Cli::try_parse_from(["gt-term", "peek", "mayor", "-n", "5"]).unwrap();
    match cli.command {
        Commands::Peek(args) => {
            assert_eq!(args.agent, "mayor");
            assert_eq!(args.lines, 5);
        }
        _ => panic!("expected peek"),
    }
    assert!(!cli.connection.local);
    assert_eq!(cli.connection.timeout, 10);
}

#[test]
fn test_cli_parsing_peek_default_lines() {
    let cli = Cli::try_parse_from(["gt-term", "peek", "gastown/polecats/nux"]).unwrap();
    assert!(matches!(cli.command, Commands::Peek(ref args) if args.lines == 50));
}

#[test]
fn test_cli_parsing_nudge_joins_words() {
    let cli = Cli::try_parse_from(["gt-term", "nudge", "mayor", "check", "your", "mail"]).unwrap();
    match cli.command {
        Commands::Nudge(args) => assert_eq!(args.message.join(" "), "check your mail"),
        _ => panic!("expected nudge"),
    }
}

#[test]
fn test_cli_parsing_nudge_requires_message() {
    assert!(Cli::try_parse_from(["gt-term", "nudge", "mayor"]).is_err());
}

#[test]
fn test_cli_parsing_keys_local() {
    let cli = Cli::try_parse_from(["gt-term", "--local", "keys", "gt-mayor", "Escape", "Enter"]).unwrap();
    assert!(cli.connection.local);
    match cli.command {
        Commands::Keys(args) => {
            assert_eq!(args.agent, "gt-mayor");
            assert_eq!(args.keys, vec!["Escape", "Enter"]);
        }
        _ => panic!("expected keys"),
    }
}

#[test]
fn test_cli_parsing_global_flags_after_subcommand() {
    let cli = Cli::try_parse_from([
        "gt-term",
        "status",
        "deacon",
        "--json",
        "--debug",
        "--coop-url",
        "http://localhost:8080",
    ])
    .unwrap();
    assert!(cli.debug);
    assert_eq!(
        cli.connection.coop_url.as_deref(),
        Some("http://localhost:8080")
    );
    assert!(matches!(cli.command, Commands::Status(ref args) if args.json));
}

#[test]
fn test_cli_parsing_local_conflicts_with_coop_url() {
    let result = Cli::try_parse_from([
        "gt-term",
        "--local",
        "--coop-url",
        "http://localhost:8080",
        "peek",
        "x",
    ]);
    assert!(result.is_err());
}

#[test]
fn test_cli_parsing_tunnel() {
    let cli = Cli::try_parse_from([
        "gt-term",
        "tunnel",
        "hq-mayor-0",
        "--namespace",
        "gastown",
        "--kubeconfig",
        "/tmp/kubeconfig",
        "--port",
        "9090",
    ])
    .unwrap();
    match cli.command {
        Commands::Tunnel(args) => {
            let config = args.tunnel_config("hq-mayor-0", Some("from-notes".into()));
            assert_eq!(config.namespace.as_deref(), Some("gastown"));
            assert_eq!(config.kubeconfig, Some(PathBuf::from("/tmp/kubeconfig")));
            assert_eq!(config.remote_port, 9090);
        }
        _ => panic!("expected tunnel"),
    }
}

#[test]
fn test_connection_coop_config_timeout() {
    let cli = Cli::try_parse_from(["gt-term", "--timeout", "3", "state", "mayor"]).unwrap();
    let config = cli.connection.coop_config();
    assert_eq!(config.timeout, std::time::Duration::from_secs(3));
}
