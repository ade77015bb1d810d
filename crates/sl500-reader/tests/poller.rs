//! Poller state-machine tests against the in-process device emulator.
//!
//! All tests run with paused time; the runtime fast-forwards through the
//! 100 ms tick interval and the detection burst, so three "seconds" of
//! polling complete instantly and deterministically.

use sl500_core::{BridgeCommand, BridgeEvent, CardUid, LedState};
use sl500_reader::mock::MockReader;
use sl500_reader::{ReaderContext, Sl500};
use tokio::sync::mpsc;
use tokio::time::{Duration, sleep, timeout};

fn spawn_context() -> (
    sl500_reader::mock::MockHandle,
    mpsc::Sender<BridgeCommand>,
    mpsc::Receiver<BridgeEvent>,
) {
    let (endpoint, handle) = MockReader::spawn();
    let (command_tx, command_rx) = mpsc::channel(8);
    let (event_tx, event_rx) = mpsc::channel(8);

    let context = ReaderContext::new(Sl500::new(endpoint), command_rx, event_tx);
    tokio::spawn(context.run());

    (handle, command_tx, event_rx)
}

#[tokio::test(start_paused = true)]
async fn armed_wait_reports_presented_card() {
    let (handle, commands, mut events) = spawn_context();

    commands.send(BridgeCommand::WaitForCard).await.unwrap();
    handle.present_card(vec![0xDE, 0xAD, 0xBE, 0xEF]);

    let event = timeout(Duration::from_secs(1), events.recv())
        .await
        .expect("detection within one second")
        .expect("event channel open");
    assert_eq!(
        event,
        BridgeEvent::CardDetected(CardUid::new(0xEFBE_ADDE))
    );
}

#[tokio::test(start_paused = true)]
async fn detection_is_at_most_once_per_wait() {
    let (handle, commands, mut events) = spawn_context();

    commands.send(BridgeCommand::WaitForCard).await.unwrap();
    handle.present_card(vec![0x01, 0x00, 0x00, 0x00]);

    timeout(Duration::from_secs(1), events.recv())
        .await
        .expect("first detection")
        .expect("event channel open");

    // The card stays in the field; without a new wait nothing more comes.
    let second = timeout(Duration::from_secs(3), events.recv()).await;
    assert!(second.is_err(), "unexpected duplicate detection");

    // A fresh wait picks the same card up again.
    commands.send(BridgeCommand::WaitForCard).await.unwrap();
    let event = timeout(Duration::from_secs(1), events.recv())
        .await
        .expect("detection after re-arm")
        .expect("event channel open");
    assert_eq!(event, BridgeEvent::CardDetected(CardUid::new(1)));
}

#[tokio::test(start_paused = true)]
async fn idle_poller_ignores_cards() {
    let (handle, _commands, mut events) = spawn_context();

    handle.present_card(vec![0x01, 0x02, 0x03, 0x04]);
    let outcome = timeout(Duration::from_secs(3), events.recv()).await;
    assert!(outcome.is_err(), "idle poller must not report cards");
}

#[tokio::test(start_paused = true)]
async fn zero_uid_never_detects() {
    let (handle, commands, mut events) = spawn_context();

    commands.send(BridgeCommand::WaitForCard).await.unwrap();
    handle.present_card(vec![0x00, 0x00, 0x00, 0x00]);

    let outcome = timeout(Duration::from_secs(3), events.recv()).await;
    assert!(outcome.is_err(), "UID 0 must read as no card");
}

#[tokio::test(start_paused = true)]
async fn detection_beeps_and_flashes() {
    let (handle, commands, mut events) = spawn_context();

    commands.send(BridgeCommand::WaitForCard).await.unwrap();
    handle.present_card(vec![0xAA, 0xBB, 0xCC, 0xDD]);

    timeout(Duration::from_secs(1), events.recv())
        .await
        .expect("detection")
        .expect("event channel open");
    // Let the burst finish.
    sleep(Duration::from_secs(1)).await;

    assert_eq!(handle.beeps(), vec![10]);
    let greens = handle
        .lights()
        .iter()
        .filter(|&&l| l == LedState::GREEN)
        .count();
    assert!(greens >= 5, "expected a five-pulse burst, saw {greens} greens");
}

#[tokio::test(start_paused = true)]
async fn silenced_feedback_still_detects() {
    let (endpoint, handle) = MockReader::spawn();
    let (command_tx, command_rx) = mpsc::channel(8);
    let (event_tx, mut event_rx) = mpsc::channel(8);

    let context = ReaderContext::new(Sl500::new(endpoint), command_rx, event_tx).feedback(false);
    tokio::spawn(context.run());

    command_tx.send(BridgeCommand::WaitForCard).await.unwrap();
    handle.present_card(vec![0x01, 0x00, 0x00, 0x00]);

    timeout(Duration::from_secs(1), event_rx.recv())
        .await
        .expect("detection")
        .expect("event channel open");
    assert!(handle.beeps().is_empty(), "feedback disabled, no beep");
}

#[tokio::test(start_paused = true)]
async fn heartbeat_toggles_every_two_seconds() {
    let (handle, _commands, _events) = spawn_context();

    sleep(Duration::from_millis(3_100)).await;

    // Ticks 0/20 switch the green LED on, ticks 2/22 switch it off.
    let lights = handle.lights();
    assert_eq!(
        lights,
        vec![LedState::GREEN, LedState::OFF, LedState::GREEN, LedState::OFF]
    );
}

#[tokio::test(start_paused = true)]
async fn no_card_polling_stays_silent() {
    let (_handle, commands, mut events) = spawn_context();

    commands.send(BridgeCommand::WaitForCard).await.unwrap();
    let outcome = timeout(Duration::from_secs(3), events.recv()).await;
    assert!(outcome.is_err(), "no card presented, no event expected");
}
