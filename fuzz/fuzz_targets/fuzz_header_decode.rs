//! Fuzz testing for the header codec.
//!
//! Decoding arbitrary bytes must never panic, and every header that
//! decodes successfully must re-encode to bytes that decode to an equal
//! header.

#![no_main]

use libfuzzer_sys::fuzz_target;

use mmforge::storage::header::StoreHeader;
use mmforge::HEADER_SIZE;

fuzz_target!(|data: &[u8]| {
    let Ok(header) = StoreHeader::decode(data) else {
        return;
    };

    let mut buf = [0u8; HEADER_SIZE];
    header.encode_into(&mut buf).expect("64-byte buffer fits a header");
    let round_tripped = StoreHeader::decode(&buf).expect("re-encoded header must decode");
    assert_eq!(round_tripped, header);
    assert_eq!(&buf[..], &data[..HEADER_SIZE]);
});
