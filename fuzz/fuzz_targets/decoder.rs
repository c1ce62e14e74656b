#![no_main]

use dexscope::{
    assembly::units_from_bytes,
    metadata::{method::MethodBody, reference::RawIndices},
};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(units) = units_from_bytes(data) else {
        return;
    };
    let Ok(body) = MethodBody::from_code_units(&units) else {
        return;
    };

    let encoded = body.encode(&RawIndices).unwrap();
    assert_eq!(encoded, units);
});
