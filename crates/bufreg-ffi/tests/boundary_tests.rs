//! FFI boundary tests
//!
//! These tests drive the registry exclusively through the `extern "C"`
//! functions, the way a foreign caller would.

use bufreg_ffi::*;
use std::ffi::CStr;
use std::ptr;

/// Helper to read the calling thread's last error
fn last_error() -> Option<String> {
    let ptr = bufreg_get_last_error();
    if ptr.is_null() {
        None
    } else {
        Some(unsafe { CStr::from_ptr(ptr) }.to_string_lossy().into_owned())
    }
}

fn create(capacity: u64) -> BufferHandle {
    match bufreg_create_buffer(capacity) {
        BufferCreationResult::Created(handle) => handle,
        BufferCreationResult::Failed => panic!("create failed: {:?}", last_error()),
    }
}

fn write(handle: BufferHandle, data: &[u8]) -> BufferWriteResult {
    unsafe { bufreg_write_buffer(handle, BufferChunk::from_slice(data)) }
}

fn read(handle: BufferHandle, out: &mut [u8]) -> BufferReadResult {
    unsafe { bufreg_read_buffer(handle, BufferChunk::from_mut_slice(out)) }
}

#[test]
fn test_hello_scenario() {
    let handle = create(16);

    assert_eq!(write(handle, b"hello"), BufferWriteResult::Written(5));

    let mut out = [0u8; 16];
    match read(handle, &mut out) {
        BufferReadResult::Read(chunk) => {
            assert_eq!(chunk.len, 5);
            assert_eq!(chunk.capacity, 16);
            assert_eq!(chunk.ptr, out.as_mut_ptr());
        }
        BufferReadResult::Failed => panic!("read failed: {:?}", last_error()),
    }
    assert_eq!(&out[..5], b"hello");

    assert_eq!(bufreg_destroy_buffer(handle), BufferDestructionResult::Destroyed);
    assert_eq!(read(handle, &mut out), BufferReadResult::Failed);
    assert!(last_error().unwrap().contains("read_buffer"));
}

#[test]
fn test_fresh_buffer_info() {
    let handle = create(32);
    assert_eq!(handle.capacity(), 32);
    assert_eq!(
        bufreg_buffer_info(handle),
        BufferInfoResult::Info(BufferInfo {
            capacity: 32,
            length: 0,
            read_position: 0,
        })
    );
    bufreg_destroy_buffer(handle);
}

#[test]
fn test_double_destroy_reports_failure() {
    let handle = create(8);
    assert_eq!(bufreg_destroy_buffer(handle), BufferDestructionResult::Destroyed);
    assert_eq!(bufreg_destroy_buffer(handle), BufferDestructionResult::Failed);
    assert!(last_error().is_some());

    bufreg_clear_error();
    assert!(last_error().is_none());
}

#[test]
fn test_every_operation_fails_after_destroy() {
    let handle = create(8);
    bufreg_destroy_buffer(handle);

    let mut out = [0u8; 8];
    assert_eq!(write(handle, b"x"), BufferWriteResult::Failed);
    assert_eq!(read(handle, &mut out), BufferReadResult::Failed);
    assert_eq!(bufreg_rewind_buffer(handle), BufferStatus::Failed);
    assert_eq!(bufreg_clear_buffer(handle), BufferStatus::Failed);
    assert_eq!(bufreg_buffer_info(handle), BufferInfoResult::Failed);
    unsafe {
        assert_eq!(
            bufreg_read_buffer_at(handle, 0, BufferChunk::from_mut_slice(&mut out)),
            BufferReadResult::Failed
        );
        assert_eq!(
            bufreg_write_buffer_at(handle, 0, BufferChunk::from_slice(b"y")),
            BufferWriteResult::Failed
        );
    }
}

#[test]
fn test_write_past_capacity_is_short_count() {
    let handle = create(4);
    assert_eq!(write(handle, b"ab"), BufferWriteResult::Written(2));
    assert_eq!(write(handle, b"cdefgh"), BufferWriteResult::Written(2));
    assert_eq!(write(handle, b"z"), BufferWriteResult::Written(0));
    bufreg_destroy_buffer(handle);
}

#[test]
fn test_read_respects_destination_capacity() {
    let handle = create(16);
    write(handle, b"0123456789");

    let mut small = [0xAAu8; 8];
    let chunk = BufferChunk::from_mut_slice(&mut small[..4]);
    match unsafe { bufreg_read_buffer(handle, chunk) } {
        BufferReadResult::Read(chunk) => assert_eq!(chunk.len, 4),
        BufferReadResult::Failed => panic!("read failed"),
    }
    assert_eq!(&small[..4], b"0123");
    assert_eq!(&small[4..], &[0xAA; 4], "wrote past the chunk's capacity");

    let mut rest = [0u8; 16];
    match read(handle, &mut rest) {
        BufferReadResult::Read(chunk) => assert_eq!(chunk.len, 6),
        BufferReadResult::Failed => panic!("read failed"),
    }
    assert_eq!(&rest[..6], b"456789");

    match read(handle, &mut rest) {
        BufferReadResult::Read(chunk) => assert_eq!(chunk.len, 0),
        BufferReadResult::Failed => panic!("read failed"),
    }

    assert_eq!(bufreg_rewind_buffer(handle), BufferStatus::Succeeded);
    match read(handle, &mut rest) {
        BufferReadResult::Read(chunk) => assert_eq!(chunk.len, 10),
        BufferReadResult::Failed => panic!("read failed"),
    }
    bufreg_destroy_buffer(handle);
}

#[test]
fn test_write_source_honours_len() {
    let handle = create(16);
    let data = *b"abcdefgh";
    let chunk = BufferChunk::from_slice(&data).with_len(3);
    assert_eq!(
        unsafe { bufreg_write_buffer(handle, chunk) },
        BufferWriteResult::Written(3)
    );
    bufreg_destroy_buffer(handle);
}

#[test]
fn test_malformed_chunks_fail() {
    let handle = create(16);
    let data = *b"abcd";

    let too_long = BufferChunk::from_slice(&data).with_len(5);
    assert_eq!(
        unsafe { bufreg_write_buffer(handle, too_long) },
        BufferWriteResult::Failed
    );
    assert!(last_error().unwrap().contains("exceeds its capacity"));

    let null = BufferChunk {
        ptr: ptr::null_mut(),
        len: 0,
        capacity: 4,
    };
    assert_eq!(unsafe { bufreg_read_buffer(handle, null) }, BufferReadResult::Failed);

    // Nothing was written by the rejected calls.
    assert_eq!(
        bufreg_buffer_info(handle),
        BufferInfoResult::Info(BufferInfo {
            capacity: 16,
            length: 0,
            read_position: 0,
        })
    );
    bufreg_destroy_buffer(handle);
}

#[test]
fn test_malformed_read_destinations_fail() {
    let handle = create(16);
    write(handle, b"payload");

    let mut out = [0u8; 8];
    let too_long = BufferChunk::from_mut_slice(&mut out[..4]).with_len(5);
    assert_eq!(unsafe { bufreg_read_buffer(handle, too_long) }, BufferReadResult::Failed);
    assert!(last_error().unwrap().contains("exceeds its capacity"));

    let oversized = BufferChunk {
        ptr: out.as_mut_ptr(),
        len: 0,
        capacity: isize::MAX as u64 + 1,
    };
    assert_eq!(unsafe { bufreg_read_buffer(handle, oversized) }, BufferReadResult::Failed);
    assert!(last_error().unwrap().contains("addressable range"));
    assert_eq!(
        unsafe { bufreg_read_buffer_at(handle, 0, oversized) },
        BufferReadResult::Failed
    );

    // The rejected reads neither copied bytes nor moved the cursor.
    assert_eq!(out, [0u8; 8]);
    assert_eq!(
        bufreg_buffer_info(handle),
        BufferInfoResult::Info(BufferInfo {
            capacity: 16,
            length: 7,
            read_position: 0,
        })
    );
    bufreg_destroy_buffer(handle);
}

#[test]
fn test_empty_chunks() {
    let handle = create(4);
    let empty = BufferChunk {
        ptr: ptr::null_mut(),
        len: 0,
        capacity: 0,
    };
    assert_eq!(
        unsafe { bufreg_write_buffer(handle, empty) },
        BufferWriteResult::Written(0)
    );
    match unsafe { bufreg_read_buffer(handle, empty) } {
        BufferReadResult::Read(chunk) => assert_eq!(chunk.len, 0),
        BufferReadResult::Failed => panic!("read failed"),
    }
    bufreg_destroy_buffer(handle);
}

#[test]
fn test_forged_handle_fails() {
    let handle = create(8);
    let forged = BufferHandle::from_parts(handle.key(), 9);
    assert_eq!(write(forged, b"x"), BufferWriteResult::Failed);
    assert_eq!(bufreg_destroy_buffer(forged), BufferDestructionResult::Failed);

    let random = BufferHandle::from_parts(InternKey::from_raw(0x7777_0000_1234), 8);
    assert_eq!(write(random, b"x"), BufferWriteResult::Failed);

    assert_eq!(bufreg_destroy_buffer(handle), BufferDestructionResult::Destroyed);
}

#[test]
fn test_offset_io() {
    let handle = create(8);
    write(handle, b"abcdef");

    let written = unsafe { bufreg_write_buffer_at(handle, 4, BufferChunk::from_slice(b"XYZW")) };
    assert_eq!(written, BufferWriteResult::Written(4));

    let mut out = [0u8; 3];
    match unsafe { bufreg_read_buffer_at(handle, 3, BufferChunk::from_mut_slice(&mut out)) } {
        BufferReadResult::Read(chunk) => assert_eq!(chunk.len, 3),
        BufferReadResult::Failed => panic!("read_at failed"),
    }
    assert_eq!(&out, b"dXY");

    let gap = unsafe { bufreg_write_buffer_at(handle, 9, BufferChunk::from_slice(b"!")) };
    assert_eq!(gap, BufferWriteResult::Failed);
    bufreg_destroy_buffer(handle);
}

#[test]
fn test_clear_buffer() {
    let handle = create(4);
    write(handle, b"full");
    assert_eq!(write(handle, b"x"), BufferWriteResult::Written(0));

    assert_eq!(bufreg_clear_buffer(handle), BufferStatus::Succeeded);
    assert_eq!(write(handle, b"x"), BufferWriteResult::Written(1));
    bufreg_destroy_buffer(handle);
}

#[test]
fn test_oversized_creation_fails_cleanly() {
    assert_eq!(bufreg_create_buffer(u64::MAX), BufferCreationResult::Failed);
    assert!(last_error().unwrap().contains("create_buffer"));
}

#[test]
fn test_out_parameter_variants() {
    unsafe {
        let mut created = BufferCreationResult::Failed;
        bufreg_create_buffer_handle(8, &mut created);
        let handle = match created {
            BufferCreationResult::Created(handle) => handle,
            BufferCreationResult::Failed => panic!("create failed"),
        };

        let mut written = BufferWriteResult::Failed;
        bufreg_write_buffer_handle(&handle, BufferChunk::from_slice(b"hey"), &mut written);
        assert_eq!(written, BufferWriteResult::Written(3));

        let mut out = [0u8; 8];
        let mut read = BufferReadResult::Failed;
        bufreg_read_buffer_handle(&handle, BufferChunk::from_mut_slice(&mut out), &mut read);
        assert!(matches!(read, BufferReadResult::Read(chunk) if chunk.len == 3));
        assert_eq!(&out[..3], b"hey");

        let mut destroyed = BufferDestructionResult::Failed;
        bufreg_destroy_buffer_handle(&handle, &mut destroyed);
        assert_eq!(destroyed, BufferDestructionResult::Destroyed);

        bufreg_destroy_buffer_handle(&handle, &mut destroyed);
        assert_eq!(destroyed, BufferDestructionResult::Failed);
    }
}

#[test]
fn test_out_parameter_null_pointers() {
    unsafe {
        // A null handle still fully initialises the result.
        let mut written = BufferWriteResult::Written(99);
        bufreg_write_buffer_handle(ptr::null(), BufferChunk::from_slice(b"x"), &mut written);
        assert_eq!(written, BufferWriteResult::Failed);
        assert_eq!(last_error().unwrap(), "write_buffer_handle: handle is null");

        // A null result cannot be written; the call only records the error.
        let handle = create(4);
        bufreg_write_buffer_handle(&handle, BufferChunk::from_slice(b"x"), ptr::null_mut());
        assert!(last_error().unwrap().contains("result is null"));
        bufreg_create_buffer_handle(4, ptr::null_mut());
        bufreg_destroy_buffer(handle);
    }
}

#[test]
fn test_concurrent_writers_on_one_handle() {
    use std::thread;

    let handle = create(8 * 128);
    let threads: Vec<_> = (0..8u8)
        .map(|i| {
            thread::spawn(move || {
                let payload = [i; 128];
                write(handle, &payload)
            })
        })
        .collect();

    for t in threads {
        assert_eq!(t.join().unwrap(), BufferWriteResult::Written(128));
    }

    let mut out = vec![0u8; 8 * 128];
    match read(handle, &mut out) {
        BufferReadResult::Read(chunk) => assert_eq!(chunk.len, 8 * 128),
        BufferReadResult::Failed => panic!("read failed"),
    }
    for run in out.chunks(128) {
        assert!(run.iter().all(|b| *b == run[0]), "torn write detected");
    }
    bufreg_destroy_buffer(handle);
}

#[test]
fn test_version_string() {
    let version = unsafe { CStr::from_ptr(bufreg_version()) };
    assert!(version.to_str().unwrap().contains("bufreg"));
}

mod properties {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn round_trip_through_chunks(payload in proptest::collection::vec(any::<u8>(), 0..256)) {
            let handle = create(payload.len() as u64);
            prop_assert_eq!(write(handle, &payload), BufferWriteResult::Written(payload.len() as u64));

            let mut out = vec![0u8; payload.len()];
            let read_len = match read(handle, &mut out) {
                BufferReadResult::Read(chunk) => chunk.len,
                BufferReadResult::Failed => u64::MAX,
            };
            prop_assert_eq!(read_len, payload.len() as u64);
            prop_assert_eq!(&out, &payload);
            prop_assert_eq!(bufreg_destroy_buffer(handle), BufferDestructionResult::Destroyed);
        }

        #[test]
        fn writes_stop_at_capacity(capacity in 0u64..128, n in 0usize..256) {
            let handle = create(capacity);
            let payload = vec![1u8; n];
            let expected = (n as u64).min(capacity);
            prop_assert_eq!(write(handle, &payload), BufferWriteResult::Written(expected));
            bufreg_destroy_buffer(handle);
        }
    }
}
