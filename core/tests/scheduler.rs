use keychain_core::{
    engine::{DeviceStatus, Error},
    proto::prelude::*,
    scheduler::{Scheduler, TaskId},
};

mod helpers;
use helpers::*;

#[test]
fn device_tasks() {
    let mut d = setup();
    let clock = ManualClock::default();
    let mut s = Scheduler::new();

    d.channel_mut()
        .push(&Request::GenerateAccount(GenerateAccountReq { index: 0 }));
    d.channel_mut().push_raw(b"garbage");

    // Run for 500ms in 10ms steps
    for _ in 0..50 {
        s.tick(&mut d, &clock);
        clock.advance_ms(10);
    }

    assert_eq!(d.channel_mut().responses(), vec![
        Response::Ok,
        Response::Error(ErrorResp::new(
            Error::MalformedMessage.code(),
            Error::MalformedMessage.reason()
        )),
    ]);

    // Provisioning polled every 50ms
    let p = d.provisioning_mut();
    assert_eq!(p.polls, 10);
    assert_eq!(
        &p.transitions[..],
        &[DeviceStatus::GeneratingAccount, DeviceStatus::Idle]
    );

    // The first protocol execution precedes the initial report
    let t = d.telemetry();
    assert_eq!(t.task(TaskId::Protocol).executions(), 4);
    assert_eq!(t.task(TaskId::Protocol).failures, 1);
    assert_eq!(t.errors(Error::MalformedMessage), 1);
    assert_eq!(t.loops(), 50);
}

#[test]
fn telemetry_report_resets() {
    let mut d = setup();
    let clock = ManualClock::default();
    let mut s = Scheduler::new();

    // First pass runs all tasks, including the initial report
    s.tick(&mut d, &clock);

    clock.advance_ms(100);
    d.channel_mut().push_raw(br#"{"type":99}"#);
    s.tick(&mut d, &clock);

    assert_eq!(d.telemetry().errors(Error::UnknownCommand), 1);
    assert_eq!(d.telemetry().task(TaskId::Protocol).failures, 1);

    // Step to the next report at 2s
    for _ in 0..190 {
        clock.advance_ms(10);
        s.tick(&mut d, &clock);
    }

    let t = d.telemetry();
    assert_eq!(t.errors(Error::UnknownCommand), 0);
    assert_eq!(t.task(TaskId::Protocol).failures, 0);
    assert_eq!(t.loops(), 1);
}

#[test]
fn disabled_provisioning() {
    let mut d = setup();
    let clock = ManualClock::default();
    let mut s = Scheduler::new();

    s.set_enabled(TaskId::Provisioning, false);

    for _ in 0..20 {
        s.tick(&mut d, &clock);
        clock.advance_ms(10);
    }

    assert_eq!(d.provisioning_mut().polls, 0);
    assert_eq!(d.telemetry().task(TaskId::Provisioning).executions(), 0);
}
