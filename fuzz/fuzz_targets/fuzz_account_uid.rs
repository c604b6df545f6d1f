#![no_main]

use authenticator_core::AccountUid;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|halves: (u64, u64)| {
    let uid = AccountUid::new(halves.0, halves.1);

    let text = uid.to_string();
    assert_eq!(text.parse::<AccountUid>().ok(), Some(uid));

    let json = serde_json::to_string(&uid).unwrap();
    assert_eq!(serde_json::from_str::<AccountUid>(&json).unwrap(), uid);
});
