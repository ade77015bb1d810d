//! Reader-side half of the bridge.
//!
//! [`ReaderContext`] owns the serial endpoint exclusively and runs a single
//! cooperative loop: a 100 ms ticker drives polling, LED heartbeat and
//! detection feedback, while a command channel from the network plane arms
//! the wait-for-card state. Detections flow back over an event channel.
//! Only one frame exchange is ever in flight.

use sl500_core::constants::{
    DETECT_BEEP_DURATION, FLASH_BURST_COUNT, FLASH_PULSE_MS, HEARTBEAT_DIVISOR,
    HEARTBEAT_OFF_OFFSET, POLL_DIVISOR, POLL_TICK_MS,
};
use sl500_core::{
    BridgeCommand, BridgeEvent, CardEvent, Error, LedState, RequestMode, Result,
};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio::time::{self, Duration, MissedTickBehavior};
use tracing::{debug, info};

use crate::reader::Sl500;

/// What the poller is currently armed to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReaderState {
    /// No wait outstanding; UIDs in the field are ignored.
    Idle,
    /// Report the next presented card.
    WaitForCard,
}

/// The reader plane: poller, detection state machine and feedback outputs.
#[derive(Debug)]
pub struct ReaderContext<T> {
    reader: Sl500<T>,
    state: ReaderState,
    /// Debounces duplicate detections for one outstanding wait. Set while
    /// idle, cleared on detection.
    acked: bool,
    tick: u32,
    /// Beep and LED burst on detection.
    feedback: bool,
    commands: mpsc::Receiver<BridgeCommand>,
    events: mpsc::Sender<BridgeEvent>,
}

impl<T: AsyncRead + AsyncWrite + Unpin> ReaderContext<T> {
    pub fn new(
        reader: Sl500<T>,
        commands: mpsc::Receiver<BridgeCommand>,
        events: mpsc::Sender<BridgeEvent>,
    ) -> Self {
        ReaderContext {
            reader,
            state: ReaderState::Idle,
            acked: true,
            tick: 0,
            feedback: true,
            commands,
            events,
        }
    }

    /// Disable the detection beep and LED burst.
    #[must_use]
    pub fn feedback(mut self, enabled: bool) -> Self {
        self.feedback = enabled;
        self
    }

    /// Run until the command channel closes or the endpoint fails.
    ///
    /// Transport errors are fatal: a reader that stops answering leaves the
    /// whole bridge in an unknown state and the process restarts clean.
    pub async fn run(mut self) -> Result<()> {
        let mut ticker = time::interval(Duration::from_millis(POLL_TICK_MS));
        // Ticks that fall inside a flash burst are dropped, not replayed.
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(BridgeCommand::WaitForCard) => self.arm_wait(),
                    None => {
                        info!("command channel closed, reader plane stopping");
                        return Ok(());
                    }
                },
                _ = ticker.tick() => self.poll_tick().await?,
            }
        }
    }

    fn arm_wait(&mut self) {
        debug!("armed: waiting for card");
        self.state = ReaderState::WaitForCard;
    }

    /// One 100 ms tick of the poller state machine.
    async fn poll_tick(&mut self) -> Result<()> {
        // Returning to rest clears any stale outstanding event.
        if self.state == ReaderState::Idle {
            self.acked = true;
        }

        let mut flashed = false;
        if self.tick % POLL_DIVISOR == 0 {
            let _ = self.reader.request(RequestMode::All).await?;
            let (_, uid) = self.reader.anticoll().await?;

            if !uid.is_none() && self.state == ReaderState::WaitForCard && self.acked {
                self.acked = false;
                self.publish(CardEvent::now(uid)).await?;
                if self.feedback {
                    self.reader.beep(DETECT_BEEP_DURATION).await?;
                    self.flash_burst().await?;
                    flashed = true;
                }
            }
        }

        // Green heartbeat: on for one tick every two seconds, suppressed
        // while the detection burst owns the LED.
        if !flashed {
            if self.tick % HEARTBEAT_DIVISOR == 0 {
                self.reader.light(LedState::GREEN).await?;
            } else if self.tick % HEARTBEAT_DIVISOR == HEARTBEAT_OFF_OFFSET {
                self.reader.light(LedState::OFF).await?;
            }
        }

        self.tick = self.tick.wrapping_add(1);
        Ok(())
    }

    async fn publish(&mut self, event: CardEvent) -> Result<()> {
        info!(uid = %event.uid, at = %event.detected_at, "card detected");
        self.state = ReaderState::Idle;
        self.events
            .send(BridgeEvent::CardDetected(event.uid))
            .await
            .map_err(|_| Error::ChannelClosed("card events"))
    }

    async fn flash_burst(&mut self) -> Result<()> {
        debug!(pulses = FLASH_BURST_COUNT, "detection flash burst");
        for _ in 0..FLASH_BURST_COUNT {
            self.reader.light(LedState::GREEN).await?;
            time::sleep(Duration::from_millis(FLASH_PULSE_MS)).await;
            self.reader.light(LedState::OFF).await?;
            time::sleep(Duration::from_millis(FLASH_PULSE_MS)).await;
        }
        Ok(())
    }
}
