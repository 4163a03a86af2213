use super::*;

fn parse(args: &[&str]) -> Cli {
    Cli::try_parse_from(std::iter::once("bookreview").chain(args.iter().copied())).unwrap()
}

#[test]
fn login_route_is_the_login_page() {
    let cli = parse(&["login", "ann", "--password", "pw"]);
    assert_eq!(cli.command.route("/login"), "/login");
    assert!(cli.command.guard().is_none());
}

#[test]
fn login_route_follows_configured_login_path() {
    let cli = parse(&["login", "ann", "--password", "wrong"]);
    let route = cli.command.route("/signin");
    assert_eq!(route, "/signin");
    assert!(bookreview::net::api::is_login_path(&route, "/signin"));
}

#[test]
fn catalog_management_requires_admin_role() {
    let cli = parse(&["books", "update", "21", "--data", r#"{"title":"Dune"}"#]);
    assert_eq!(cli.command.route("/login"), "/admin");
    assert_eq!(cli.command.guard(), Some(RouteGuard::requiring(Role::Admin)));

    let cli = parse(&["books", "simple"]);
    assert_eq!(cli.command.route("/login"), "/books");
    assert!(cli.command.guard().is_none());
}

#[test]
fn admin_user_lookup_commands_parse() {
    let cli = parse(&["admin", "search", "ann"]);
    let Command::Admin(AdminCommand { command: AdminSubcommand::Search { query } }) = cli.command else {
        panic!("expected admin search");
    };
    assert_eq!(query, "ann");

    let cli = parse(&["admin", "details", "8"]);
    assert!(matches!(cli.command, Command::Admin(AdminCommand { command: AdminSubcommand::Details { user_id: 8 } })));
}

#[test]
fn review_update_needs_sign_in() {
    let cli = parse(&["reviews", "update", "4", "--rating", "5"]);
    assert_eq!(cli.command.guard(), Some(RouteGuard::authenticated()));
    let cli = parse(&["reviews", "all"]);
    assert_eq!(cli.command.route("/login"), "/profile");
}

#[test]
fn admin_commands_require_admin_role() {
    let cli = parse(&["admin", "role", "8", "admin"]);
    assert_eq!(cli.command.route("/login"), "/admin");
    assert_eq!(cli.command.guard(), Some(RouteGuard::requiring(Role::Admin)));
    let Command::Admin(AdminCommand { command: AdminSubcommand::Role { user_id, role } }) = cli.command else {
        panic!("expected admin role command");
    };
    assert_eq!((user_id, role), (8, Role::Admin));
}

#[test]
fn review_routes_point_at_the_book() {
    let cli = parse(&["reviews", "list", "42"]);
    assert_eq!(cli.command.route("/login"), "/books/42");
    assert_eq!(cli.command.guard(), Some(RouteGuard::authenticated()));
}

#[test]
fn catalog_browsing_is_public() {
    let cli = parse(&["books", "list"]);
    assert!(cli.command.guard().is_none());
    let Command::Books(BooksCommand { command: BooksSubcommand::List { page, size, sort_by, sort_dir } }) = cli.command
    else {
        panic!("expected books list");
    };
    assert_eq!((page, size, sort_by.as_str(), sort_dir.as_str()), (0, 12, "createdAt", "desc"));
}

#[test]
fn register_defaults_to_user_role() {
    let cli = parse(&["register", "ann", "ann@example.test", "--password", "secret1"]);
    let Command::Register { role, .. } = cli.command else {
        panic!("expected register");
    };
    assert_eq!(role, Role::User);
}

#[test]
fn unknown_role_is_rejected() {
    let args = ["bookreview", "admin", "role", "8", "owner"];
    assert!(Cli::try_parse_from(args).is_err());
}

#[test]
fn verbosity_maps_to_log_level() {
    assert_eq!(log_level(0), tracing::Level::WARN);
    assert_eq!(log_level(1), tracing::Level::INFO);
    assert_eq!(log_level(3), tracing::Level::DEBUG);
}
