//! Datagram-in, lines-out tests of the full decode and dispatch pipeline.

use std::fs;

use common::testing::{proc_event_bytes, DatagramBuilder};
use common::{event::PROC_EVENT_EXIT, CN_IDX_PROC, CN_VAL_PROC};
use procsnoop::dispatch::Counters;
use procsnoop::{Dispatcher, FilterConfig, ProcfsResolver};
use tempfile::TempDir;

fn fake_proc(entries: &[(u32, &str)]) -> TempDir {
    let dir = TempDir::new().unwrap();
    for (pid, cmdline) in entries {
        let pid_dir = dir.path().join(pid.to_string());
        fs::create_dir(&pid_dir).unwrap();
        fs::write(pid_dir.join("cmdline"), cmdline).unwrap();
    }
    dir
}

fn filter(exec: bool, fork: bool, thread: bool) -> FilterConfig {
    FilterConfig::new(exec, fork, thread).unwrap()
}

fn feed(filter: FilterConfig, proc: &TempDir, datagrams: &[Vec<u8>]) -> (String, Counters) {
    let mut dispatcher = Dispatcher::new(filter, ProcfsResolver::new(proc.path()), Vec::new());
    for dgram in datagrams {
        dispatcher.handle_datagram(dgram, dgram.len()).unwrap();
    }
    let counters = dispatcher.counters();
    (String::from_utf8(dispatcher.into_sink()).unwrap(), counters)
}

#[test]
fn fork_is_reported_with_child_cmdline() {
    let proc = fake_proc(&[(20, "worker\0--id\x001")]);
    let dgram = DatagramBuilder::new().fork(10, 10, 20, 20).build();

    let (out, _) = feed(filter(false, true, false), &proc, &[dgram]);
    assert_eq!(out, "Fork 10 20 worker --id 1\n");
}

#[test]
fn exec_only_hides_forks_and_thread_execs() {
    let proc = fake_proc(&[(30, "/usr/bin/make")]);
    let dgram = DatagramBuilder::new()
        .fork(1, 1, 30, 30)
        .fork(30, 30, 31, 30)
        .exec(31, 30)
        .exec(30, 30)
        .build();

    let (out, counters) = feed(filter(true, false, false), &proc, &[dgram]);
    assert_eq!(out, "Exec - 30 /usr/bin/make\n");
    assert_eq!(counters.frames, 4);
    assert_eq!(counters.emitted, 1);
}

#[test]
fn fork_and_thread_both_reported() {
    let proc = fake_proc(&[(40, "java -jar app.jar")]);
    let dgram = DatagramBuilder::new()
        .fork(1, 1, 40, 40)
        .fork(40, 40, 41, 40)
        .build();

    let (out, _) = feed(filter(false, true, true), &proc, &[dgram]);
    assert_eq!(out, "Fork 1 40 java -jar app.jar\nThread 40 41 java -jar app.jar\n");
}

#[test]
fn vanished_process_gets_placeholder() {
    let proc = fake_proc(&[]);
    let dgram = DatagramBuilder::new().exec(77, 77).build();

    let (out, _) = feed(filter(true, false, false), &proc, &[dgram]);
    assert_eq!(out, "Exec - 77 <N/A>\n");
}

#[test]
fn overrun_frame_printed_once_under_any_filter() {
    let proc = fake_proc(&[]);
    for f in [
        filter(true, false, false),
        filter(false, true, false),
        filter(true, true, true),
    ] {
        let dgram = DatagramBuilder::new().overrun().build();
        let (out, counters) = feed(f, &proc, &[dgram]);
        assert_eq!(out, "overrun\n");
        assert_eq!(counters.overruns, 1);
    }
}

#[test]
fn control_and_foreign_frames_are_silent() {
    let proc = fake_proc(&[]);
    let dgram = DatagramBuilder::new()
        .noop()
        .error(-1)
        .connector(CN_IDX_PROC + 1, CN_VAL_PROC, &proc_event_bytes(1, &[1, 1, 2, 2]))
        .proc_event(PROC_EVENT_EXIT, &[2, 2, 0, 17, 1, 1])
        .build();

    let (out, counters) = feed(filter(true, true, true), &proc, &[dgram]);
    assert!(out.is_empty());
    assert_eq!(counters.frames, 4);
    assert_eq!(counters.ignored, 4);
}

#[test]
fn overlong_frame_stops_the_datagram() {
    let proc = fake_proc(&[(5, "sh")]);
    let mut bogus = [0u8; 16];
    bogus[0..4].copy_from_slice(&4096u32.to_ne_bytes());
    let dgram = DatagramBuilder::new()
        .exec(5, 5)
        .raw(&bogus)
        .build();
    let trailing = DatagramBuilder::new().exec(5, 5).build();

    let (out, counters) = feed(filter(true, false, false), &proc, &[dgram, trailing]);
    assert_eq!(out, "Exec - 5 sh\nExec - 5 sh\n");
    assert_eq!(counters.datagrams, 2);
    assert_eq!(counters.truncated, 1);
}

#[test]
fn frames_are_emitted_in_wire_order() {
    let proc = fake_proc(&[(2, "a"), (3, "b"), (4, "c")]);
    let dgram = DatagramBuilder::new()
        .exec(3, 3)
        .fork(1, 1, 2, 2)
        .overrun()
        .exec(4, 4)
        .build();

    let (out, _) = feed(filter(true, true, false), &proc, &[dgram]);
    assert_eq!(out, "Exec - 3 b\nFork 1 2 a\noverrun\nExec - 4 c\n");
}

#[test]
fn short_receive_count_limits_the_walk() {
    let proc = fake_proc(&[(8, "x")]);
    let dgram = DatagramBuilder::new().exec(8, 8).exec(8, 8).build();
    let first_len = dgram.len() / 2;

    let mut dispatcher = Dispatcher::new(
        filter(true, false, false),
        ProcfsResolver::new(proc.path()),
        Vec::new(),
    );
    dispatcher.handle_datagram(&dgram, first_len).unwrap();
    assert_eq!(dispatcher.into_sink(), b"Exec - 8 x\n");
}
