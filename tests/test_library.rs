use glirc_lua::{Extension, ExtensionConfig, ExtensionError};
use glirc_lua_runtime::testing::{FakeHost, FAKE_API};
use glirc_lua_runtime::MessageCode;
use std::io::Write;

fn session(fake: &FakeHost) -> Box<Extension> {
    Extension::start(&FAKE_API, fake.as_glirc(), ExtensionConfig::default()).unwrap()
}

fn eval<T: for<'lua> mlua::FromLuaMulti<'lua>>(extension: &Extension, code: &str) -> T {
    extension.lua().load(code).eval().unwrap()
}

/// Error text raised by a failing call, or "ok"
fn raised(extension: &Extension, call: &str) -> String {
    eval(
        extension,
        &format!("local ok, err = pcall(function() {} end) if ok then return 'ok' end return err", call),
    )
}

fn connected() -> Box<FakeHost> {
    let fake = FakeHost::new();
    fake.add_network("mynet", Some("mynick"));
    fake
}

#[test]
fn test_send_message_parameter_limit() {
    let fake = connected();
    let ext = session(&fake);

    let fifteen = (1..=15).map(|i| format!("'p{}'", i)).collect::<Vec<_>>().join(", ");
    assert_eq!(
        raised(&ext, &format!("glirc.send_message('mynet', 'CMD', {})", fifteen)),
        "ok"
    );
    assert_eq!(fake.sent()[0].params.len(), 15);
    assert_eq!(fake.sent()[0].params[14], b"p15");

    assert_eq!(
        raised(&ext, &format!("glirc.send_message('mynet', 'CMD', {}, 'p16')", fifteen)),
        "too many parameters"
    );
    // The oversized request never reached the host
    assert_eq!(fake.send_attempts(), 1);
}

#[test]
fn test_send_message_arguments() {
    let fake = connected();
    let ext = session(&fake);

    ext.run_script(b"glirc.send_message('mynet', 'PRIVMSG', 'someone', 42)", "send").unwrap();
    ext.run_script(b"glirc.send_message('mynet', 'PRIVMSG', '#c', 'a\\0b')", "send").unwrap();
    ext.run_script(b"glirc.send_message('mynet', 'PING')", "send").unwrap();

    let sent = fake.sent();
    assert_eq!(sent[0].params, vec![b"someone".to_vec(), b"42".to_vec()]);
    assert_eq!(sent[1].params[1], b"a\0b");
    assert!(sent[2].params.is_empty());

    assert_eq!(
        raised(&ext, "glirc.send_message('mynet', 'PRIVMSG', {})"),
        "bad argument #3 to 'send_message' (string expected, got table)"
    );
    assert_eq!(
        raised(&ext, "glirc.send_message('elsewhere', 'PING')"),
        "client failure"
    );
    fake.fail_sends(true);
    assert_eq!(raised(&ext, "glirc.send_message('mynet', 'PING')"), "client failure");
}

#[test]
fn test_inject_chat() {
    let fake = connected();
    let ext = session(&fake);

    ext.run_script(
        b"glirc.inject_chat('mynet', 'nick!user@host', '#mychannel', 'An injected message')",
        "inject",
    )
    .unwrap();
    let line = &fake.injected()[0];
    assert_eq!(line.network, b"mynet");
    assert_eq!(line.source, b"nick!user@host");
    assert_eq!(line.message, b"An injected message");

    assert_eq!(raised(&ext, "glirc.inject_chat('nowhere', 's', 't', 'm')"), "client failure");
    assert_eq!(
        raised(&ext, "glirc.inject_chat('mynet', 's', 't', 'm', 'extra')"),
        "bad argument #5 to 'inject_chat' (no value expected, got string)"
    );
}

#[test]
fn test_print_and_error_channels() {
    let fake = connected();
    let ext = session(&fake);

    ext.run_script(b"glirc.print('This shows up on the * window') glirc.error('problem')", "console")
        .unwrap();
    assert_eq!(
        fake.printed(),
        vec![
            (MessageCode::Normal, b"This shows up on the * window".to_vec()),
            (MessageCode::Error, b"problem".to_vec()),
        ]
    );
    assert_eq!(
        raised(&ext, "glirc.print('a', 'b')"),
        "bad argument #2 to 'print' (no value expected, got string)"
    );
    assert_eq!(fake.printed().len(), 2);
}

#[test]
fn test_identifier_cmp() {
    let fake = connected();
    let ext = session(&fake);

    let results: (i64, i64, i64, i64) = eval(
        &ext,
        r#"return glirc.identifier_cmp('somenick', 'SOMENICK'),
                  glirc.identifier_cmp('surprise{|}~', 'surprise[\\]^'),
                  glirc.identifier_cmp('apple', 'zebra'),
                  glirc.identifier_cmp('zebra', 'apple')"#,
    );
    assert_eq!(results, (0, 0, -1, 1));
}

#[test]
fn test_listings() {
    let fake = connected();
    fake.add_network("othernet", None);
    fake.add_channel("mynet", "#somechan", &[("chatter", ""), ("an_op", "@")]);
    fake.add_channel("mynet", "#quiet", &[]);
    let ext = session(&fake);

    let networks: Vec<String> = eval(&ext, "return glirc.list_networks()");
    assert_eq!(networks, vec!["mynet", "othernet"]);

    let channels: Vec<String> = eval(&ext, "return glirc.list_channels('mynet')");
    assert_eq!(channels, vec!["#somechan", "#quiet"]);

    let empty: i64 = eval(&ext, "return #glirc.list_channels('othernet')");
    assert_eq!(empty, 0);

    let users: Vec<String> = eval(&ext, "return glirc.list_channel_users('mynet', '#SOMECHAN')");
    assert_eq!(users, vec!["chatter", "an_op"]);

    let first: String = eval(&ext, "return glirc.list_channel_users('mynet', '#somechan')[1]");
    assert_eq!(first, "chatter");

    assert_eq!(raised(&ext, "glirc.list_channels('nowhere')"), "no such network");
    assert_eq!(
        raised(&ext, "glirc.list_channel_users('mynet', '#absent')"),
        "no such channel"
    );
    fake.fail_network_list(true);
    assert_eq!(raised(&ext, "glirc.list_networks()"), "client failure");

    let ledger = fake.ledger();
    assert!(ledger.allocations() > 0);
    assert_eq!(ledger.outstanding(), 0);
    assert_eq!(ledger.double_releases(), 0);
}

#[test]
fn test_nullable_lookups() {
    let fake = connected();
    fake.add_network("othernet", None);
    fake.set_account("mynet", "chatter", "chatter_account");
    fake.add_channel("mynet", "#somechan", &[("an_op", "@"), ("voiced", "+")]);
    let ext = session(&fake);

    let nicks: (Option<String>, Option<String>) =
        eval(&ext, "return glirc.my_nick('mynet'), glirc.my_nick('othernet')");
    assert_eq!(nicks, (Some("mynick".to_string()), None));

    let accounts: (Option<String>, Option<String>) = eval(
        &ext,
        "return glirc.user_account('mynet', 'CHATTER'), glirc.user_account('mynet', 'stranger')",
    );
    assert_eq!(accounts, (Some("chatter_account".to_string()), None));

    let modes: (Option<String>, Option<String>, Option<String>) = eval(
        &ext,
        "return glirc.user_channel_modes('mynet', '#somechan', 'an_op'),
                glirc.user_channel_modes('mynet', '#somechan', 'voiced'),
                glirc.user_channel_modes('mynet', '#somechan', 'absent')",
    );
    assert_eq!(modes, (Some("@".to_string()), Some("+".to_string()), None));

    let ledger = fake.ledger();
    assert_eq!(ledger.allocations(), 4);
    assert_eq!(ledger.releases(), 4);
}

#[test]
fn test_current_focus_shapes() {
    let fake = connected();
    let ext = session(&fake);
    let focus = || -> (Option<String>, Option<String>) { eval(&ext, "return glirc.current_focus()") };

    assert_eq!(focus(), (None, None));

    fake.set_focus(Some("mynet"), None);
    assert_eq!(focus(), (Some("mynet".to_string()), None));

    fake.set_focus(Some("mynet"), Some("#somechan"));
    assert_eq!(focus(), (Some("mynet".to_string()), Some("#somechan".to_string())));

    let count: i64 = eval(&ext, "return select('#', glirc.current_focus())");
    assert_eq!(count, 2);
    assert_eq!(fake.ledger().outstanding(), 0);
}

#[test]
fn test_window_operations_accept_nil() {
    let fake = connected();
    let ext = session(&fake);

    ext.run_script(
        b"glirc.mark_seen('mynet', '#somechan')
          glirc.mark_seen('mynet')
          glirc.clear_window(nil, 'chatter')
          glirc.clear_window()",
        "windows",
    )
    .unwrap();

    assert_eq!(
        fake.seen(),
        vec![
            (Some(b"mynet".to_vec()), Some(b"#somechan".to_vec())),
            (Some(b"mynet".to_vec()), None),
        ]
    );
    assert_eq!(
        fake.cleared(),
        vec![(None, Some(b"chatter".to_vec())), (None, None)]
    );
    assert_eq!(
        raised(&ext, "glirc.mark_seen('a', 'b', 'c')"),
        "bad argument #3 to 'mark_seen' (no value expected, got string)"
    );
}

#[test]
fn test_boolean_queries() {
    let fake = connected();
    fake.set_logged_on("mynet", "chatter");
    let ext = session(&fake);

    let answers: (bool, bool, bool, bool, bool) = eval(
        &ext,
        "return glirc.is_logged_on('mynet', 'Chatter'),
                glirc.is_logged_on('mynet', 'ghost'),
                glirc.is_channel('mynet', 'chatter'),
                glirc.is_channel('mynet', '#somechan'),
                glirc.is_channel('mynet', '&somechan')",
    );
    assert_eq!(answers, (true, false, false, true, true));
}

#[test]
fn test_resolve_path() {
    let fake = connected();
    let ext = session(&fake);

    let paths: (String, String, String, Option<String>) = eval(
        &ext,
        "return glirc.resolve_path('relative/path'),
                glirc.resolve_path('/absolute/path'),
                glirc.resolve_path('~/path'),
                glirc.resolve_path('')",
    );
    assert_eq!(
        paths,
        (
            "/home/user/.config/glirc/relative/path".to_string(),
            "/absolute/path".to_string(),
            "/home/user/path".to_string(),
            None
        )
    );
}

#[test]
fn test_static_fields() {
    let fake = connected();
    let ext = session(&fake);

    let (reset, red, light_gray): (String, String, String) =
        eval(&ext, "return glirc.format.reset, glirc.format.red, glirc.format.light_gray");
    assert_eq!((reset.as_str(), red.as_str(), light_gray.as_str()), ("\x0f", "\x0304", "\x0315"));

    let version: (i64, i64) = eval(&ext, "return glirc.version.major, glirc.version.minor");
    assert_eq!(version, (0, 1));
}

#[test]
fn test_custom_global_and_startup_script() {
    let fake = connected();
    let mut script = tempfile::NamedTempFile::new().unwrap();
    writeln!(script, "irc.send_message('mynet', 'JOIN', '#startup')").unwrap();

    let config = ExtensionConfig {
        global_name: "irc".to_string(),
        script: Some(script.path().to_path_buf()),
        ..ExtensionConfig::default()
    };
    let ext = Extension::start(&FAKE_API, fake.as_glirc(), config).unwrap();

    assert_eq!(fake.sent()[0].params, vec![b"#startup".to_vec()]);
    let has_default: bool = eval(&ext, "return glirc ~= nil");
    assert!(!has_default);
}

#[test]
fn test_start_errors() {
    let fake = connected();

    let missing = ExtensionConfig {
        script: Some("/nonexistent/init.lua".into()),
        ..ExtensionConfig::default()
    };
    assert!(matches!(
        Extension::start(&FAKE_API, fake.as_glirc(), missing),
        Err(ExtensionError::Script { .. })
    ));

    assert!(matches!(
        Extension::start(&FAKE_API, std::ptr::null_mut(), ExtensionConfig::default()),
        Err(ExtensionError::NullClient)
    ));

    let ext = session(&fake);
    assert!(matches!(
        ext.run_script(b"error('boom')", "failing"),
        Err(ExtensionError::Lua(_))
    ));
}
