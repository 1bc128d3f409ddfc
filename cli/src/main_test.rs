use super::*;

use forum_session::RouteClass;

fn parse(args: &[&str]) -> Command {
    let mut argv = vec!["forum-cli"];
    argv.extend_from_slice(args);
    Cli::try_parse_from(argv).unwrap().command
}

#[test]
fn auth_commands_are_public_only() {
    let login = parse(&["login", "--identifier", "a@b.com", "--password", "x"]);
    let register = parse(&["register", "--email", "a@b.com", "--name", "A", "--password", "x"]);

    assert_eq!(guard::classify(&login.route()), Some(RouteClass::PublicOnly));
    assert_eq!(guard::classify(&register.route()), Some(RouteClass::PublicOnly));
}

#[test]
fn every_other_command_is_protected() {
    let commands = [
        parse(&["logout"]),
        parse(&["me"]),
        parse(&["topics"]),
        parse(&["subscribe", "5"]),
        parse(&["unsubscribe", "5"]),
        parse(&["toggle", "5"]),
        parse(&["subscriptions"]),
        parse(&["posts"]),
        parse(&["post", "3"]),
        parse(&["create-post", "--topic-id", "1", "--title", "t", "--content", "c"]),
        parse(&["comment", "--post-id", "3", "--content", "hi"]),
    ];
    for command in &commands {
        assert_eq!(guard::classify(&command.route()), Some(RouteClass::Protected), "{command:?}");
    }
}

#[test]
fn post_routes_carry_the_id() {
    assert_eq!(parse(&["post", "12"]).route(), "/posts/12");
    assert_eq!(parse(&["comment", "--post-id", "7", "--content", "x"]).route(), "/posts/7");
}

#[test]
fn flags_override_environment_config() {
    let cli = Cli::try_parse_from(["forum-cli", "--base-url", "http://h:1", "--token-path", "/tmp/t", "me"]).unwrap();
    let config = load_config(&cli).unwrap();

    assert_eq!(config.base_url, "http://h:1");
    assert_eq!(config.token_path, PathBuf::from("/tmp/t"));
}

#[test]
fn unauthorized_policy_flag_accepts_boolish_values() {
    let cli = Cli::try_parse_from(["forum-cli", "--clear-session-on-unauthorized", "no", "posts"]).unwrap();
    assert!(!load_config(&cli).unwrap().clear_session_on_unauthorized);
}

#[test]
fn zero_timeout_flag_is_refused() {
    assert!(Cli::try_parse_from(["forum-cli", "--request-timeout-secs", "0", "posts"]).is_err());
}
