#![no_main]

use h1wire::codec::AccumulationBuffer;
use libfuzzer_sys::fuzz_target;

// First byte picks flags and the chunk size, the rest is the response.
fuzz_target!(|data: &[u8]| {
    let Some((&control, input)) = data.split_first() else {
        return;
    };

    let binary_response = control & 0x01 != 0;
    let head_request = control & 0x02 != 0;
    let chunk_size = (control >> 2) as usize + 1;

    let mut buffer = AccumulationBuffer::new(binary_response, head_request);

    for chunk in input.chunks(chunk_size) {
        buffer.extend(chunk);

        match buffer.try_decode() {
            Ok(Some(response)) => {
                if head_request {
                    assert!(response.body().is_empty());
                }
                return;
            }
            Ok(None) => {}
            Err(_) => return,
        }
    }

    let _ = buffer.finish();
});
