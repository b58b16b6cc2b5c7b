#![forbid(unsafe_code)]

//! The root application context.
//!
//! [`App`] owns the document, every controller, the event bus, the voice
//! capability, and the deferred-work timer queue. Controllers never see each
//! other: the app dispatches host events to them, collects the [`Signal`]s
//! they emit, and applies the cross-cutting reactions itself.
//!
//! # Lifecycle
//!
//! 1. [`App::builder`] → [`AppBuilder::build`]: validate config, pick the
//!    transport.
//! 2. [`App::init`]: document → controllers → bus → voice capability. Each
//!    step marks the [`ReadinessBarrier`].
//! 3. [`App::handle_event`] / [`App::tick`] / [`App::flush_submissions`] while
//!    the page lives.
//! 4. [`App::cleanup`]: releases scroll lock and focus trap, cancels timers,
//!    stops the voice client.
//!
//! # Failure Modes
//!
//! A controller error never takes down its siblings. Every controller call
//! goes through one handler that logs with `tracing::error!` and moves on.

use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;

use tracing::{debug, error, info, trace, warn};
use vitrine_core::{Document, Dom, DomError, Event, EventOutcome, Instant, TimerQueue};
use vitrine_widgets::{
    Controller, FormController, MobileMenuController, ModalError, ModalManager,
    NavigationController, Outbox, ScrollEffectsController, Signal, VoiceCommand, VoiceEvent,
    VoiceWidget, VoiceWidgetConfig,
};

use crate::api::{DemoTransport, HealthStatus, Transport};
use crate::bus::EventBus;
use crate::capability::{VoiceCapability, VoiceLoader};
use crate::config::{ApiSection, SiteConfig};
use crate::error::{SiteError, TransportError};
use crate::readiness::{Modules, ReadinessBarrier};

/// Page-level state, written only by [`App`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ApplicationState {
    pub is_initialized: bool,
    pub is_mobile_menu_open: bool,
    pub active_section: String,
}

/// Work scheduled for a later tick.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Deferred {
    CloseModal { modal: String },
}

fn report(controller: &'static str, err: &dyn std::error::Error) {
    error!(controller, error = %err, "controller call failed");
}

/// Builder for [`App`].
pub struct AppBuilder<D: Dom> {
    dom: D,
    config: SiteConfig,
    transport: Option<Rc<dyn Transport>>,
    voice_loader: Option<VoiceLoader>,
}

impl<D: Dom> AppBuilder<D> {
    pub fn config(mut self, config: SiteConfig) -> Self {
        self.config = config;
        self
    }

    /// Use `transport` instead of the one implied by `config.api`.
    pub fn transport(mut self, transport: Rc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Loader for the live voice client, tried once during `init`.
    pub fn voice_loader(mut self, loader: VoiceLoader) -> Self {
        self.voice_loader = Some(loader);
        self
    }

    pub fn build(self) -> Result<App<D>, SiteError> {
        self.config.validate()?;
        let transport = match self.transport {
            Some(transport) => transport,
            None if self.config.api.demo_mode => {
                info!("demo mode: submissions are answered locally");
                Rc::new(DemoTransport::new())
            }
            None => default_transport(&self.config.api)?,
        };
        debug!(transport = transport.name(), "transport selected");
        let required = if self.config.voice.enabled {
            Modules::all()
        } else {
            Modules::all() - Modules::VOICE
        };
        Ok(App {
            dom: self.dom,
            state: ApplicationState {
                active_section: self.config.navigation.home_section.clone(),
                ..ApplicationState::default()
            },
            config: self.config,
            navigation: None,
            scroll_fx: None,
            mobile_menu: None,
            modals: None,
            forms: None,
            voice: None,
            capability: None,
            voice_loader: self.voice_loader,
            bus: EventBus::new(),
            timers: TimerQueue::new(),
            readiness: ReadinessBarrier::new(required),
            transport,
        })
    }
}

#[cfg(feature = "http")]
fn default_transport(api: &ApiSection) -> Result<Rc<dyn Transport>, SiteError> {
    Ok(Rc::new(crate::api::HttpTransport::new(api)?))
}

#[cfg(not(feature = "http"))]
fn default_transport(_api: &ApiSection) -> Result<Rc<dyn Transport>, SiteError> {
    warn!("built without the `http` feature; submissions are answered locally");
    Ok(Rc::new(DemoTransport::new()))
}

/// The site application.
pub struct App<D: Dom = Document> {
    dom: D,
    config: SiteConfig,
    state: ApplicationState,
    navigation: Option<NavigationController>,
    scroll_fx: Option<ScrollEffectsController>,
    mobile_menu: Option<MobileMenuController>,
    modals: Option<ModalManager>,
    forms: Option<FormController>,
    voice: Option<VoiceWidget>,
    capability: Option<VoiceCapability>,
    voice_loader: Option<VoiceLoader>,
    bus: EventBus<Signal>,
    timers: TimerQueue<Deferred>,
    readiness: ReadinessBarrier,
    transport: Rc<dyn Transport>,
}

impl<D: Dom> fmt::Debug for App<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("App")
            .field("state", &self.state)
            .field("navigation", &self.navigation.is_some())
            .field("scroll_fx", &self.scroll_fx.is_some())
            .field("mobile_menu", &self.mobile_menu.is_some())
            .field("modals", &self.modals.is_some())
            .field("forms", &self.forms.is_some())
            .field("voice", &self.capability)
            .field("pending_timers", &self.timers.len())
            .field("transport", &self.transport.name())
            .finish()
    }
}

impl<D: Dom> App<D> {
    pub fn builder(dom: D) -> AppBuilder<D> {
        AppBuilder {
            dom,
            config: SiteConfig::default(),
            transport: None,
            voice_loader: None,
        }
    }

    // --- Accessors ---

    pub fn dom(&self) -> &D {
        &self.dom
    }

    /// Host-side access, e.g. to update scroll position before dispatching
    /// `Event::Scroll`.
    pub fn dom_mut(&mut self) -> &mut D {
        &mut self.dom
    }

    pub fn config(&self) -> &SiteConfig {
        &self.config
    }

    pub fn state(&self) -> &ApplicationState {
        &self.state
    }

    pub fn bus(&self) -> &EventBus<Signal> {
        &self.bus
    }

    pub fn readiness(&self) -> &ReadinessBarrier {
        &self.readiness
    }

    pub fn navigation(&self) -> Option<&NavigationController> {
        self.navigation.as_ref()
    }

    pub fn scroll_fx(&self) -> Option<&ScrollEffectsController> {
        self.scroll_fx.as_ref()
    }

    pub fn mobile_menu(&self) -> Option<&MobileMenuController> {
        self.mobile_menu.as_ref()
    }

    pub fn modals(&self) -> Option<&ModalManager> {
        self.modals.as_ref()
    }

    pub fn forms(&self) -> Option<&FormController> {
        self.forms.as_ref()
    }

    pub fn voice(&self) -> Option<&VoiceWidget> {
        self.voice.as_ref()
    }

    pub fn capability(&self) -> Option<&VoiceCapability> {
        self.capability.as_ref()
    }

    /// Deferred actions not yet due.
    pub fn pending_timers(&self) -> usize {
        self.timers.len()
    }

    /// Run `callback` once initialization completes.
    pub fn on_ready(&mut self, callback: impl FnOnce() + 'static) {
        self.readiness.on_ready(callback);
    }

    // --- Lifecycle ---

    /// Bind every controller to the document.
    ///
    /// Controllers whose elements are absent from the page are skipped.
    /// Malformed form markup (an unknown rule, a bad rule parameter) is an
    /// authoring error and fails startup.
    pub fn init(&mut self, now: Instant) -> Result<(), SiteError> {
        if self.state.is_initialized {
            warn!("init called twice");
            return Ok(());
        }
        self.readiness.mark(Modules::DOCUMENT);
        let mut out = Outbox::new();

        let mut navigation =
            NavigationController::attach(&self.dom, self.config.navigation.to_config());
        if let Err(err) = navigation.sync(&mut self.dom, &mut out) {
            report("navigation", &err);
        }
        self.navigation = Some(navigation);
        self.readiness.mark(Modules::NAVIGATION);

        let mut scroll_fx = ScrollEffectsController::attach(&self.dom, self.config.scroll_fx.to_config());
        // First frame reveals whatever is already in view.
        scroll_fx.request_frame();
        self.scroll_fx = Some(scroll_fx);
        self.readiness.mark(Modules::SCROLL_FX);

        self.mobile_menu = optional(
            "mobile-menu",
            MobileMenuController::attach(&mut self.dom, self.config.mobile_menu.to_config()),
        );
        self.readiness.mark(Modules::MOBILE_MENU);

        self.modals = optional(
            "modal",
            ModalManager::attach(&mut self.dom, self.config.modal.to_config()),
        );
        self.readiness.mark(Modules::MODALS);

        self.forms = Some(FormController::attach(&mut self.dom, self.config.forms.to_config())?);
        self.readiness.mark(Modules::FORMS);

        // Bus subscribers may be registered before init; nothing is
        // published until the controllers exist.
        self.readiness.mark(Modules::BUS);

        if self.config.voice.enabled {
            self.voice = optional(
                "voice",
                VoiceWidget::attach(&mut self.dom, VoiceWidgetConfig::default()),
            );
            let capability = VoiceCapability::select(&self.config.voice, self.voice_loader.take());
            self.capability = Some(capability);
            self.readiness.mark(Modules::VOICE);
        }

        self.state.is_initialized = true;
        info!(
            ready = self.readiness.is_ready(),
            mobile_menu = self.mobile_menu.is_some(),
            modals = self.modals.is_some(),
            voice = self.voice.is_some(),
            "site initialized"
        );
        self.route(out, now);
        Ok(())
    }

    /// Release everything the controllers hold on the page.
    pub fn cleanup(&mut self, now: Instant) {
        let mut out = Outbox::new();
        if let Some(modals) = self.modals.as_mut()
            && let Err(err) = modals.force_close(&mut self.dom, &mut out)
        {
            report("modal", &err);
        }
        if let Some(menu) = self.mobile_menu.as_mut()
            && let Err(err) = menu.force_close(&mut self.dom, &mut out)
        {
            report("mobile-menu", &err);
        }
        self.timers.clear();
        if let Some(capability) = self.capability.as_mut() {
            capability.stop(now);
            let events = capability.poll(now);
            if let Some(voice) = self.voice.as_mut() {
                for event in &events {
                    if let Err(err) = voice.apply(&mut self.dom, event, &mut out) {
                        report("voice", &err);
                    }
                }
            }
        }
        self.route(out, now);
        self.state.is_initialized = false;
        self.readiness.reset();
        info!("site cleaned up");
    }

    // --- Dispatch ---

    /// The document plus every attached controller, topmost layer first.
    fn controllers(&mut self) -> (&mut D, [Option<&mut dyn Controller>; 6]) {
        let controllers: [Option<&mut dyn Controller>; 6] = [
            self.modals.as_mut().map(|c| c as &mut dyn Controller),
            self.mobile_menu.as_mut().map(|c| c as &mut dyn Controller),
            self.navigation.as_mut().map(|c| c as &mut dyn Controller),
            self.forms.as_mut().map(|c| c as &mut dyn Controller),
            self.scroll_fx.as_mut().map(|c| c as &mut dyn Controller),
            self.voice.as_mut().map(|c| c as &mut dyn Controller),
        ];
        (&mut self.dom, controllers)
    }

    /// Deliver a host event to the controllers.
    ///
    /// Keyboard events go to the topmost layer first (modal, then mobile
    /// menu) and stop at the first controller that handles them. Every other
    /// event reaches all controllers.
    pub fn handle_event(&mut self, event: &Event, now: Instant) -> EventOutcome {
        let mut out = Outbox::new();
        let stop_when_handled = matches!(event, Event::Key(_));
        let mut outcome = EventOutcome::IGNORED;
        {
            let (dom, controllers) = self.controllers();
            for controller in controllers.into_iter().flatten() {
                match controller.handle_event(&mut *dom, event, now, &mut out) {
                    Ok(result) => outcome = outcome.merge(result),
                    Err(err) => report(controller.name(), &err),
                }
                if stop_when_handled && outcome.handled {
                    break;
                }
            }
        }
        self.pump_voice(now, &mut out);
        self.route(out, now);
        outcome
    }

    /// Advance transitions, debounces, voice events, and deferred work.
    pub fn tick(&mut self, now: Instant) {
        let mut out = Outbox::new();
        {
            let (dom, controllers) = self.controllers();
            for controller in controllers.into_iter().flatten() {
                if let Err(err) = controller.tick(&mut *dom, now, &mut out) {
                    report(controller.name(), &err);
                }
            }
        }
        for deferred in self.timers.drain_due(now) {
            self.run_deferred(deferred);
        }
        self.pump_voice(now, &mut out);
        self.route(out, now);
    }

    fn run_deferred(&mut self, deferred: Deferred) {
        match deferred {
            Deferred::CloseModal { modal } => {
                let Some(modals) = self.modals.as_mut() else {
                    return;
                };
                if modals.active_modal() != Some(modal.as_str()) {
                    trace!(modal = %modal, "auto-close skipped, modal no longer active");
                    return;
                }
                match modals.close(&mut self.dom) {
                    Ok(_) => debug!(modal = %modal, "modal auto-closed"),
                    Err(ModalError::Busy) => debug!(modal = %modal, "auto-close skipped, modal busy"),
                    Err(err) => report("modal", &err),
                }
            }
        }
    }

    /// Open a modal programmatically.
    pub fn open_modal(&mut self, id: &str) -> Result<(), SiteError> {
        let modals = self
            .modals
            .as_mut()
            .ok_or_else(|| SiteError::Widget(ModalError::Unknown(id.to_string()).into()))?;
        modals
            .open(&mut self.dom, id)
            .map_err(|e| SiteError::Widget(e.into()))
    }

    /// Submit a form programmatically, as if its submit button was pressed.
    pub fn submit_form(&mut self, form_id: &str, now: Instant) -> EventOutcome {
        match self.forms.as_ref().and_then(|f| f.form_element(form_id)) {
            Some(el) => self.handle_event(&Event::Submit(el), now),
            None => {
                warn!(form = form_id, "submit for unknown form");
                EventOutcome::IGNORED
            }
        }
    }

    // --- Transport ---

    /// Perform the network calls for queued submissions and apply results.
    ///
    /// Returns how many submissions were flushed.
    pub async fn flush_submissions(&mut self, now: Instant) -> usize {
        let requests = match self.forms.as_mut() {
            Some(forms) => forms.take_requests(),
            None => return 0,
        };
        if requests.is_empty() {
            return 0;
        }
        let transport = Rc::clone(&self.transport);
        let mut out = Outbox::new();
        for request in &requests {
            let result = transport.submit(request).await;
            if let Err(err) = &result {
                warn!(form = %request.form_id, transport = transport.name(), error = %err, "transport error");
            }
            if let Some(forms) = self.forms.as_mut()
                && let Err(err) = forms.finish_submit(&mut self.dom, &request.form_id, result, &mut out)
            {
                report("forms", &err);
            }
        }
        self.route(out, now);
        requests.len()
    }

    /// Query the API health endpoint. Diagnostics only.
    pub async fn check_health(&self) -> Result<HealthStatus, TransportError> {
        let transport = Rc::clone(&self.transport);
        transport.health().await
    }

    // --- Voice ---

    fn pump_voice(&mut self, now: Instant, out: &mut Outbox) {
        let (Some(voice), Some(capability)) = (self.voice.as_mut(), self.capability.as_mut()) else {
            return;
        };
        let mut events = Vec::new();
        for command in voice.take_commands() {
            match command {
                VoiceCommand::Start => {
                    if let Err(err) = capability.start(&self.config.voice, now) {
                        warn!(error = %err, "voice call failed to start");
                        events.push(VoiceEvent::Error(err.to_string()));
                    }
                }
                VoiceCommand::Stop => capability.stop(now),
            }
        }
        events.extend(capability.poll(now));
        for event in &events {
            if let Err(err) = voice.apply(&mut self.dom, event, out) {
                report("voice", &err);
            }
        }
    }

    // --- Signal routing ---

    fn route(&mut self, out: Outbox, now: Instant) {
        let mut queue: VecDeque<Signal> = out.into();
        while let Some(signal) = queue.pop_front() {
            trace!(signal = signal.name(), "routing");
            let mut follow_up = Outbox::new();
            match &signal {
                Signal::SectionChanged { section } => {
                    self.state.active_section.clone_from(section);
                }
                Signal::NavigateRequested { .. } => {
                    if let Some(menu) = self.mobile_menu.as_mut()
                        && menu.is_open()
                        && let Err(err) = menu.close(&mut self.dom, true, &mut follow_up)
                    {
                        report("mobile-menu", &err);
                    }
                }
                Signal::MobileMenuChanged { open } => {
                    self.state.is_mobile_menu_open = *open;
                }
                Signal::FormSubmitted {
                    form,
                    success: true,
                    ..
                } => self.schedule_modal_close(form, now),
                _ => {}
            }
            self.bus.publish(&signal);
            queue.extend(follow_up);
        }
    }

    fn schedule_modal_close(&mut self, form: &str, now: Instant) {
        let (Some(forms), Some(modals)) = (self.forms.as_ref(), self.modals.as_ref()) else {
            return;
        };
        let Some(el) = forms.form_element(form) else {
            return;
        };
        if let Some(modal) = modals.modal_containing(&self.dom, el) {
            let delay = modals.config().auto_close_delay;
            debug!(form, modal, ?delay, "modal close scheduled");
            self.timers.schedule_after(
                now,
                delay,
                Deferred::CloseModal {
                    modal: modal.to_string(),
                },
            );
        }
    }
}

/// Keep a controller whose elements are present; skip it when they are not.
fn optional<T>(name: &'static str, attached: Result<T, DomError>) -> Option<T> {
    match attached {
        Ok(controller) => Some(controller),
        Err(DomError::MissingId(id)) => {
            debug!(controller = name, missing = %id, "controller skipped");
            None
        }
        Err(err) => {
            report(name, &err);
            None
        }
    }
}
