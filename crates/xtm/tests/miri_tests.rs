//! Miri-compatible tests exercising xtm's unsafe code paths.
//!
//! Run with: `cargo +nightly miri test --test miri_tests`
//!
//! Covers the `Slot` union reads/writes, the ring's `MaybeUninit` buffer
//! handling, and the wake channel's raw fd syscalls (eventfd/pipe are
//! supported under Miri's isolation-disabled mode via `-Zmiri-disable-isolation`).

use xtm::{consume, PushFlags, PushOutcome, Queue, QueueFlags};

#[test]
fn miri_pointer_transfer_round_trip() {
    let queue = Queue::new(4, QueueFlags::NONE).unwrap();
    assert_eq!(
        queue.push_ptr(100usize as *mut (), PushFlags::NONE),
        PushOutcome::Pushed
    );
    assert_eq!(
        queue.push_ptr(200usize as *mut (), PushFlags::NONE),
        PushOutcome::Pushed
    );

    let mut buf = [std::ptr::null_mut(); 4];
    let n = queue.pop_ptrs(&mut buf);
    assert_eq!(n, 2);
    assert_eq!(buf[0], 100usize as *mut ());
    assert_eq!(buf[1], 200usize as *mut ());
}

#[test]
fn miri_function_dispatch_round_trip() {
    static mut SUM: usize = 0;
    unsafe fn add(arg: *mut ()) {
        unsafe {
            SUM += arg as usize;
        }
    }

    let queue = Queue::new(4, QueueFlags::NONE).unwrap();
    queue.push_fun(add, 10usize as *mut (), PushFlags::NONE);
    queue.push_fun(add, 32usize as *mut (), PushFlags::NONE);
    assert_eq!(queue.invoke_funs_all(), 2);
    assert_eq!(unsafe { SUM }, 42);
}

#[test]
fn miri_wrap_around_exercises_every_slot() {
    let queue = Queue::new(4, QueueFlags::NONE).unwrap(); // usable capacity 3
    let mut buf = [std::ptr::null_mut(); 3];
    for round in 0..5u8 {
        for i in 0..3usize {
            let value = (round as usize) * 3 + i + 1;
            assert_eq!(
                queue.push_ptr(value as *mut (), PushFlags::NONE),
                PushOutcome::Pushed
            );
        }
        let n = queue.pop_ptrs(&mut buf);
        assert_eq!(n, 3);
    }
}

#[test]
fn miri_abandoned_partial_drain_does_not_duplicate_or_lose_cells() {
    let queue = Queue::new(8, QueueFlags::NONE).unwrap();
    for i in 1..=5usize {
        queue.push_ptr(i as *mut (), PushFlags::NONE);
    }

    let mut small_buf = [std::ptr::null_mut(); 2];
    assert_eq!(queue.pop_ptrs(&mut small_buf), 2);
    assert_eq!(small_buf, [1usize as *mut (), 2usize as *mut ()]);

    let mut rest = [std::ptr::null_mut(); 8];
    let n = queue.pop_ptrs(&mut rest);
    assert_eq!(n, 3);
    assert_eq!(
        &rest[..3],
        &[3usize as *mut (), 4usize as *mut (), 5usize as *mut ()]
    );
}

#[test]
#[cfg_attr(miri, ignore = "requires -Zmiri-disable-isolation for eventfd/pipe syscalls")]
fn miri_notify_consume_round_trip_over_real_fd() {
    let queue = Queue::new(4, QueueFlags::NONE).unwrap();
    queue.notify_consumer().unwrap();
    consume(queue.consumer_fd()).unwrap();
}
