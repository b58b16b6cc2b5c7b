#![forbid(unsafe_code)]

//! Voice capability selection.
//!
//! A live vendor client sits behind [`VoiceClient`]. When it cannot be
//! loaded (no credentials, vendor script missing, simulation forced) the
//! application runs [`SimulatedVoice`] instead, which produces the same
//! lifecycle events from a timer script. The choice is made once, at
//! startup, by [`VoiceCapability::select`].

use std::time::Duration;

use tracing::{info, warn};
use vitrine_core::{Instant, TimerQueue};
use vitrine_widgets::VoiceEvent;

use crate::config::VoiceSection;
use crate::error::CapabilityError;

/// A voice-assistant client.
///
/// Clients are polled: `poll` returns the lifecycle events that happened
/// since the previous call.
pub trait VoiceClient {
    fn name(&self) -> &'static str;
    fn start(&mut self, settings: &VoiceSection, now: Instant) -> Result<(), CapabilityError>;
    fn stop(&mut self, now: Instant);
    fn poll(&mut self, now: Instant) -> Vec<VoiceEvent>;
}

/// Loader for the live client, invoked at most once.
pub type VoiceLoader =
    Box<dyn FnOnce(&VoiceSection) -> Result<Box<dyn VoiceClient>, CapabilityError>>;

/// Greeting spoken by the simulated assistant.
pub const DEMO_GREETING: &str =
    "Hi! This is a demo of our voice assistant. Book a consultation to hear the real thing.";

/// Timer-scripted stand-in for the live client.
#[derive(Debug, Clone)]
pub struct SimulatedVoice {
    connect_delay: Duration,
    speech: Duration,
    script: TimerQueue<VoiceEvent>,
    in_call: bool,
}

impl Default for SimulatedVoice {
    fn default() -> Self {
        Self::new(Duration::from_millis(800), Duration::from_millis(2500))
    }
}

impl SimulatedVoice {
    pub fn new(connect_delay: Duration, speech: Duration) -> Self {
        Self {
            connect_delay,
            speech,
            script: TimerQueue::new(),
            in_call: false,
        }
    }

    pub fn in_call(&self) -> bool {
        self.in_call
    }
}

impl VoiceClient for SimulatedVoice {
    fn name(&self) -> &'static str {
        "simulated"
    }

    fn start(&mut self, _settings: &VoiceSection, now: Instant) -> Result<(), CapabilityError> {
        if self.in_call {
            return Ok(());
        }
        self.in_call = true;
        self.script.clear();
        let connected = now + self.connect_delay;
        self.script.schedule(connected, VoiceEvent::CallStart);
        self.script.schedule(connected, VoiceEvent::SpeechStart);
        self.script
            .schedule(connected, VoiceEvent::Message(DEMO_GREETING.to_string()));
        self.script.schedule(connected + self.speech, VoiceEvent::SpeechEnd);
        Ok(())
    }

    fn stop(&mut self, now: Instant) {
        if !self.in_call {
            return;
        }
        self.in_call = false;
        self.script.clear();
        self.script.schedule(now, VoiceEvent::CallEnd);
    }

    fn poll(&mut self, now: Instant) -> Vec<VoiceEvent> {
        self.script.drain_due(now)
    }
}

/// The voice client chosen at startup.
pub enum VoiceCapability {
    Live(Box<dyn VoiceClient>),
    Simulated(SimulatedVoice),
}

impl std::fmt::Debug for VoiceCapability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Live(client) => f.debug_tuple("Live").field(&client.name()).finish(),
            Self::Simulated(sim) => f.debug_tuple("Simulated").field(sim).finish(),
        }
    }
}

impl VoiceCapability {
    /// Pick the live client when possible, otherwise the simulation.
    pub fn select(settings: &VoiceSection, loader: Option<VoiceLoader>) -> Self {
        if settings.simulate {
            info!("voice simulation forced by config");
            return Self::Simulated(SimulatedVoice::default());
        }
        let attempt = match loader {
            None => Err(CapabilityError::Unavailable("voice client")),
            Some(_) if !settings.has_credentials() => Err(CapabilityError::StartFailed {
                name: "voice client",
                reason: "missing public key or assistant id".to_string(),
            }),
            Some(load) => load(settings),
        };
        match attempt {
            Ok(client) => {
                info!(client = client.name(), "live voice client selected");
                Self::Live(client)
            }
            Err(err) => {
                warn!(error = %err, "voice client unavailable, using simulation");
                Self::Simulated(SimulatedVoice::default())
            }
        }
    }

    pub fn is_live(&self) -> bool {
        matches!(self, Self::Live(_))
    }

    fn client(&mut self) -> &mut dyn VoiceClient {
        match self {
            Self::Live(client) => client.as_mut(),
            Self::Simulated(sim) => sim,
        }
    }

    pub fn start(&mut self, settings: &VoiceSection, now: Instant) -> Result<(), CapabilityError> {
        self.client().start(settings, now)
    }

    pub fn stop(&mut self, now: Instant) {
        self.client().stop(now);
    }

    pub fn poll(&mut self, now: Instant) -> Vec<VoiceEvent> {
        self.client().poll(now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    struct Scripted(Vec<VoiceEvent>);

    impl VoiceClient for Scripted {
        fn name(&self) -> &'static str {
            "scripted"
        }
        fn start(&mut self, _: &VoiceSection, _: Instant) -> Result<(), CapabilityError> {
            self.0.push(VoiceEvent::CallStart);
            Ok(())
        }
        fn stop(&mut self, _: Instant) {
            self.0.push(VoiceEvent::CallEnd);
        }
        fn poll(&mut self, _: Instant) -> Vec<VoiceEvent> {
            std::mem::take(&mut self.0)
        }
    }

    fn credentials() -> VoiceSection {
        VoiceSection {
            enabled: true,
            public_key: "pk".into(),
            assistant_id: "asst".into(),
            simulate: false,
        }
    }

    fn scripted_loader() -> Option<VoiceLoader> {
        Some(Box::new(|_: &VoiceSection| {
            Ok(Box::new(Scripted(Vec::new())) as Box<dyn VoiceClient>)
        }))
    }

    #[test]
    fn selects_live_when_loader_succeeds() {
        let mut cap = VoiceCapability::select(&credentials(), scripted_loader());
        assert!(cap.is_live());
        let now = Instant::now();
        cap.start(&credentials(), now).unwrap();
        assert_eq!(cap.poll(now), vec![VoiceEvent::CallStart]);
    }

    #[test]
    fn falls_back_to_simulation() {
        assert!(!VoiceCapability::select(&credentials(), None).is_live());
        let no_keys = VoiceSection {
            public_key: String::new(),
            ..credentials()
        };
        assert!(!VoiceCapability::select(&no_keys, scripted_loader()).is_live());
        let failing: VoiceLoader =
            Box::new(|_: &VoiceSection| Err(CapabilityError::Unavailable("vendor sdk")));
        assert!(!VoiceCapability::select(&credentials(), Some(failing)).is_live());
        let forced = VoiceSection {
            simulate: true,
            ..credentials()
        };
        assert!(!VoiceCapability::select(&forced, scripted_loader()).is_live());
    }

    #[test]
    fn simulation_plays_the_call_script() {
        let mut sim = SimulatedVoice::new(Duration::from_millis(100), Duration::from_millis(500));
        let t0 = Instant::now();
        sim.start(&VoiceSection::default(), t0).unwrap();
        assert!(sim.poll(t0 + Duration::from_millis(99)).is_empty());
        assert_eq!(
            sim.poll(t0 + Duration::from_millis(100)),
            vec![
                VoiceEvent::CallStart,
                VoiceEvent::SpeechStart,
                VoiceEvent::Message(DEMO_GREETING.to_string()),
            ]
        );
        assert_eq!(sim.poll(t0 + Duration::from_millis(600)), vec![VoiceEvent::SpeechEnd]);
        sim.stop(t0 + Duration::from_millis(700));
        assert!(!sim.in_call());
        assert_eq!(sim.poll(t0 + Duration::from_millis(700)), vec![VoiceEvent::CallEnd]);
    }

    #[test]
    fn stop_cancels_pending_script() {
        let mut sim = SimulatedVoice::default();
        let t0 = Instant::now();
        sim.start(&VoiceSection::default(), t0).unwrap();
        sim.stop(t0);
        assert_eq!(sim.poll(t0 + Duration::from_secs(10)), vec![VoiceEvent::CallEnd]);
    }
}
