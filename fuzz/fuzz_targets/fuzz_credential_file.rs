#![no_main]

use authenticator_core::{parse_credentials, AccountUid};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(contents) = std::str::from_utf8(data) else {
        return;
    };

    // Arbitrary documents must parse or fail cleanly
    if let Ok(credentials) = parse_credentials(contents) {
        for uid in credentials.keys() {
            // Keys that are uids survive a print and parse
            if let Ok(parsed) = uid.parse::<AccountUid>() {
                assert_eq!(parsed.to_string().parse::<AccountUid>().ok(), Some(parsed));
            }
        }
    }
});
