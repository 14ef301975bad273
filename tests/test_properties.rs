use glirc_lua::{Extension, ExtensionConfig};
use glirc_lua_runtime::identifier_cmp_int;
use glirc_lua_runtime::testing::{FakeHost, FAKE_API};
use mlua::{Function, Table};
use proptest::prelude::*;

/// Compare two byte strings through `glirc.identifier_cmp`
fn lua_cmp(ext: &Extension, a: &[u8], b: &[u8]) -> i64 {
    let lua = ext.lua();
    let glirc: Table = lua.globals().get("glirc").unwrap();
    let cmp: Function = glirc.get("identifier_cmp").unwrap();
    let args = (lua.create_string(a).unwrap(), lua.create_string(b).unwrap());
    cmp.call(args).unwrap()
}

fn session(fake: &FakeHost) -> Box<Extension> {
    Extension::start(&FAKE_API, fake.as_glirc(), ExtensionConfig::default()).unwrap()
}

proptest! {
    #[test]
    fn prop_lua_identifier_cmp_antisymmetric(a in proptest::collection::vec(any::<u8>(), 0..16),
                                             b in proptest::collection::vec(any::<u8>(), 0..16)) {
        let fake = FakeHost::new();
        let ext = session(&fake);
        prop_assert_eq!(lua_cmp(&ext, &a, &b), -lua_cmp(&ext, &b, &a));
    }

    #[test]
    fn prop_lua_identifier_cmp_matches_runtime(a in "[a-zA-Z{|}~\\[\\]^_0-9]{0,12}",
                                               b in "[a-zA-Z{|}~\\[\\]^_0-9]{0,12}") {
        let fake = FakeHost::new();
        let ext = session(&fake);
        let expected = i64::from(identifier_cmp_int(a.as_bytes(), b.as_bytes()));
        prop_assert_eq!(lua_cmp(&ext, a.as_bytes(), b.as_bytes()), expected);
    }

    #[test]
    fn prop_lua_identifier_cmp_ignores_case(s in "[a-z{|}~]{0,16}") {
        let upper: String = s.chars().map(|c| match c {
            '{' => '[',
            '|' => '\\',
            '}' => ']',
            '~' => '^',
            c => c.to_ascii_uppercase(),
        }).collect();
        let fake = FakeHost::new();
        let ext = session(&fake);
        prop_assert_eq!(lua_cmp(&ext, s.as_bytes(), upper.as_bytes()), 0);
    }
}
