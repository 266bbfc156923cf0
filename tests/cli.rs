use clap::Parser;
use showcall::cli::{AuthCommand, Cli, Command, PollsCommand};

#[test]
fn parses_auth_login_with_tokens() {
    let cli = Cli::try_parse_from([
        "showcall",
        "auth",
        "login",
        "--access-token",
        "aaa.bbb.ccc",
        "--refresh-token",
        "refresh-1",
    ])
    .expect("cli parse should work");

    match cli.command {
        Command::Auth(auth) => match auth.command {
            AuthCommand::Login(login) => {
                assert_eq!(login.access_token.as_deref(), Some("aaa.bbb.ccc"));
                assert_eq!(login.refresh_token.as_deref(), Some("refresh-1"));
                assert!(!login.stdin);
            }
            _ => panic!("expected login subcommand"),
        },
        _ => panic!("expected auth command"),
    }
}

#[test]
fn parses_auth_refresh() {
    let cli = Cli::try_parse_from(["showcall", "auth", "refresh"]).expect("cli parse should work");
    match cli.command {
        Command::Auth(auth) => assert!(matches!(auth.command, AuthCommand::Refresh)),
        _ => panic!("expected auth command"),
    }
}

#[test]
fn parses_polls_ls_with_filters() {
    let cli = Cli::try_parse_from([
        "showcall", "polls", "ls", "--limit", "5", "--status", "open",
    ])
    .expect("cli parse should work");

    match cli.command {
        Command::Polls(polls) => match polls.command {
            PollsCommand::Ls(ls) => {
                assert_eq!(ls.limit, 5);
                assert_eq!(ls.status.as_deref(), Some("open"));
            }
            _ => panic!("expected ls subcommand"),
        },
        _ => panic!("expected polls command"),
    }
}

#[test]
fn parses_stake() {
    let cli = Cli::try_parse_from(["showcall", "stake", "poll-1", "opt-2", "3.50"])
        .expect("cli parse should work");

    match cli.command {
        Command::Stake(stake) => {
            assert_eq!(stake.poll_id, "poll-1");
            assert_eq!(stake.option_id, "opt-2");
            assert_eq!(stake.amount, "3.50");
        }
        _ => panic!("expected stake command"),
    }
}

#[test]
fn parses_run_with_globals() {
    let cli = Cli::try_parse_from(["showcall", "--profile", "work", "--json", "-vv", "run"])
        .expect("cli parse should work");

    assert_eq!(cli.profile, "work");
    assert!(cli.json);
    assert_eq!(cli.verbose, 2);
    assert!(matches!(cli.command, Command::Run));
}
