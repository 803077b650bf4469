//! Show controller - reconciliation core
//!
//! Diffs each delivered target against the last observed target and drives
//! the active playback handle so that what is audible matches the target.
//! All inputs run to completion through `&mut self`; the only awaits are
//! inside the unlock sequence.

use crate::{
    drift,
    error::{PlaybackError, Result},
    events::ShowEvent,
    gain::GainController,
    surface::{AudioGraphBuilder, DualBuffer},
    types::{ControllerConfig, Item, ShowInfo, ShowStatus, TargetShowInfo},
    unlock::{AudioUnlocker, UnlockReport},
    watchdog::StallWatchdog,
};
use tracing::{debug, error, info, warn};

/// Inputs accepted by the controller
#[derive(Debug, Clone, PartialEq)]
pub enum ControllerEvent {
    /// Transport delivered a new target
    TargetUpdated(TargetShowInfo),

    /// Listener changed the volume (0-100)
    VolumeChanged(f64),

    /// User gesture requested audio unlock
    UnlockRequested,
}

/// What changed between two successive targets
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct TargetDiff {
    status_changed: bool,
    set_changed: bool,
    next_set_changed: bool,
    seconds_until_set_changed: bool,
    current_time_changed: bool,
}

impl TargetDiff {
    fn between(last: &TargetShowInfo, next: &TargetShowInfo) -> Self {
        let seconds_until_set_changed = match (last, next) {
            (
                TargetShowInfo::WaitingUntilStart {
                    seconds_until_set: a,
                    ..
                },
                TargetShowInfo::WaitingUntilStart {
                    seconds_until_set: b,
                    ..
                },
            ) => a != b,
            _ => false,
        };

        let current_time_changed = match (last, next) {
            (
                TargetShowInfo::Playing {
                    current_time: a, ..
                },
                TargetShowInfo::Playing {
                    current_time: b, ..
                },
            ) => a != b,
            _ => false,
        };

        Self {
            status_changed: last.status() != next.status(),
            set_changed: last.current_set().map(|item| &item.id)
                != next.current_set().map(|item| &item.id),
            next_set_changed: last.next_set() != next.next_set(),
            seconds_until_set_changed,
            current_time_changed,
        }
    }

    /// Needs an audible action on the playback handle
    fn affects_audio(self) -> bool {
        self.status_changed || self.set_changed
    }

    fn time_changed(self) -> bool {
        self.seconds_until_set_changed || self.current_time_changed
    }

    /// Needs the observed mirror refreshed without touching the handle
    fn mirror_changed(self) -> bool {
        self.time_changed() || self.next_set_changed
    }
}

/// Everything the reconciler owns for one show session
struct ControllerState {
    surface: Option<DualBuffer>,
    unlocker: AudioUnlocker,
    gain: GainController,
    watchdog: StallWatchdog,

    /// Most recent target delivered by the transport
    target: Option<TargetShowInfo>,
    /// Diff base; advanced on every pass that gets past the unlock gate
    last_target: Option<TargetShowInfo>,
    /// Single pending-change slot
    pending_change: Option<TargetShowInfo>,
    /// Active handle was replaced; the next drain reloads its source
    surface_replaced: bool,

    show_info: ShowInfo,
    pending_events: Vec<ShowEvent>,
}

impl ControllerState {
    /// One reconciliation pass against the most recent target
    fn check_target(&mut self, ignore_unlock_wait: bool) -> Result<()> {
        let Some(target) = self.target.clone() else {
            debug!("No target delivered yet");
            return Ok(());
        };

        // Showing ENDED is never blocked on unlock
        let ignore_unlock_wait = ignore_unlock_wait || target.status() == ShowStatus::Ended;

        let waiting_for_unlock = !ignore_unlock_wait
            && !self.unlocker.is_unlocked()
            && self.show_info.status() == ShowStatus::AwaitingUnlock;
        if waiting_for_unlock {
            debug!(status = %target.status(), "Deferring target until audio is unlocked");
            return Ok(());
        }

        let Some(last_target) = self.last_target.replace(target.clone()) else {
            debug!(status = %target.status(), "First target observed");
            return self.queue_change(target);
        };

        let diff = TargetDiff::between(&last_target, &target);
        debug!(?diff, "Diffed target");

        if diff.affects_audio() {
            self.queue_change(target)
        } else {
            if diff.mirror_changed() {
                self.update_clock(&target);
            }
            Ok(())
        }
    }

    fn queue_change(&mut self, change: TargetShowInfo) -> Result<()> {
        if let Some(superseded) = self.pending_change.replace(change) {
            debug!(status = %superseded.status(), "Superseded pending change");
        }
        self.drain_pending_change()
    }

    /// Apply the pending change to the active handle and observed state
    fn drain_pending_change(&mut self) -> Result<()> {
        let Some(change) = self.pending_change.take() else {
            return Ok(());
        };

        let needs_surface = matches!(
            change.status(),
            ShowStatus::WaitingUntilStart | ShowStatus::Playing
        );
        if needs_surface && self.surface.is_none() {
            debug!(status = %change.status(), "No playback surface attached; keeping change pending");
            self.pending_change = Some(change);
            return Ok(());
        }

        debug!(status = %change.status(), "Draining pending change");
        let reload = std::mem::take(&mut self.surface_replaced);

        match change {
            TargetShowInfo::WaitingUntilStart {
                current_set,
                next_set,
                seconds_until_set,
            } => {
                self.load_item(current_set.as_ref(), reload);
                self.set_show_info(ShowInfo::WaitingUntilStart {
                    current_set,
                    next_set,
                    seconds_until_set,
                });
            }
            TargetShowInfo::Playing {
                current_set,
                next_set,
                current_time,
            } => {
                self.load_item(current_set.as_ref(), reload);
                self.start_playback(current_set.as_ref(), current_time);
                self.set_show_info(ShowInfo::Playing {
                    current_set,
                    next_set,
                    current_time,
                    delay: 0.0,
                });
            }
            TargetShowInfo::Ended => {
                self.set_show_info(ShowInfo::Ended);
            }
            TargetShowInfo::AwaitingUnlock => {
                error!("AWAITING_UNLOCK reached the drain step");
                return Err(PlaybackError::UnexpectedStatus(ShowStatus::AwaitingUnlock));
            }
        }

        Ok(())
    }

    /// Load `item` onto the active handle if it is not already the observed item
    ///
    /// `reload` skips the observed-item check for a freshly attached handle.
    fn load_item(&mut self, item: Option<&Item>, reload: bool) {
        let Some(item) = item else {
            return;
        };

        if !reload
            && self
                .show_info
                .current_set()
                .is_some_and(|observed| observed.id == item.id)
        {
            return;
        }

        let Some(surface) = self.surface.as_mut() else {
            return;
        };
        let handle = surface.active_mut();
        if handle.source() == Some(item.audio_url.as_str()) {
            debug!(item_id = %item.id, "Source already loaded");
            return;
        }

        handle.set_source(&item.audio_url);
        info!(item_id = %item.id, artist = %item.artist, url = %item.audio_url, "Loaded set audio");
        self.pending_events.push(ShowEvent::SourceChanged {
            item_id: item.id.clone(),
            url: item.audio_url.clone(),
        });
    }

    fn start_playback(&mut self, item: Option<&Item>, current_time: f64) {
        let Some(surface) = self.surface.as_mut() else {
            return;
        };
        let handle = surface.active_mut();

        if current_time > 0.0 {
            if let Err(e) = handle.seek(current_time) {
                warn!("Seek to {:.3}s failed: {}", current_time, e);
            }
        }
        if let Err(e) = handle.play() {
            warn!("Playback start rejected: {}", e);
        }

        self.watchdog.reset();
        self.pending_events.push(ShowEvent::PlaybackStarted {
            item_id: item.map(|item| item.id.clone()),
            position: current_time.max(0.0),
        });
    }

    /// Pure clock-offset update; never touches the handle's source or position
    fn update_clock(&mut self, target: &TargetShowInfo) {
        if let Some(pending) = self.pending_change.as_mut() {
            *pending = target.clone();
            debug!("Refreshed pending change with newer clock");
            return;
        }

        match (self.show_info.status(), target) {
            (
                ShowStatus::WaitingUntilStart,
                TargetShowInfo::WaitingUntilStart {
                    next_set: target_next,
                    seconds_until_set: target_seconds,
                    ..
                },
            ) => {
                if let ShowInfo::WaitingUntilStart {
                    next_set,
                    seconds_until_set,
                    ..
                } = &mut self.show_info
                {
                    next_set.clone_from(target_next);
                    *seconds_until_set = *target_seconds;
                }
                self.pending_events.push(ShowEvent::CountdownUpdated {
                    seconds_until_set: *target_seconds,
                });
            }
            (
                ShowStatus::Playing,
                TargetShowInfo::Playing {
                    next_set: target_next,
                    current_time: target_time,
                    ..
                },
            ) => {
                let local_elapsed = self
                    .surface
                    .as_ref()
                    .map_or(0.0, |surface| surface.active().current_time());
                let new_delay =
                    drift::compute_delay(&self.show_info, target, local_elapsed).unwrap_or(0.0);

                if let ShowInfo::Playing {
                    next_set,
                    current_time,
                    delay,
                    ..
                } = &mut self.show_info
                {
                    next_set.clone_from(target_next);
                    *current_time = *target_time;
                    *delay = new_delay;
                }
                debug!(
                    target_time = *target_time,
                    local_elapsed, delay = new_delay, "Recomputed drift"
                );
                self.pending_events.push(ShowEvent::DelayUpdated {
                    current_time: *target_time,
                    delay: new_delay,
                });

                let item_id = target.current_set().map(|item| item.id.clone());
                if self
                    .watchdog
                    .observe(item_id.as_deref(), *target_time, local_elapsed)
                {
                    warn!(
                        item_id = item_id.as_deref().unwrap_or("-"),
                        local_elapsed, "Playback appears stalled"
                    );
                    self.pending_events
                        .push(ShowEvent::PlaybackStalled { item_id });
                }
            }
            (observed, _) => {
                debug!(
                    %observed,
                    target_status = %target.status(),
                    "Observed status lags target; skipping clock update"
                );
            }
        }
    }

    fn set_show_info(&mut self, show_info: ShowInfo) {
        let from = self.show_info.status();
        let to = show_info.status();
        self.show_info = show_info;

        if from != to {
            info!(%from, %to, "Show status changed");
            self.pending_events
                .push(ShowEvent::StatusChanged { from, to });
        }
    }
}

impl Drop for ControllerState {
    fn drop(&mut self) {
        self.unlocker.release();
        if let Some(surface) = self.surface.as_mut() {
            surface.release();
        }
    }
}

/// Playback reconciliation for one show session
///
/// Owns the playback surface, the audio engine and the diff memory:
/// - Target updates are diffed and applied (`on_target_update`)
/// - Unlock runs the opportunistic unlock sequence (`initialize_audio`)
/// - Volume is applied to the gain stage independently (`set_volume`)
/// - Observed state is exposed for rendering (`show_info`, `drain_events`)
pub struct ShowController {
    state: ControllerState,
}

impl ShowController {
    /// Create a controller with no playback surface attached
    pub fn new(config: ControllerConfig) -> Self {
        Self {
            state: ControllerState {
                surface: None,
                unlocker: AudioUnlocker::new(config.analyser, config.skip_audio_graph),
                gain: GainController::new(config.initial_volume),
                watchdog: StallWatchdog::new(config.stall_threshold),
                target: None,
                last_target: None,
                pending_change: None,
                surface_replaced: false,
                show_info: ShowInfo::default(),
                pending_events: Vec::new(),
            },
        }
    }

    /// Attach the playback surface at construction time
    pub fn with_surface(mut self, surface: DualBuffer) -> Self {
        self.state.surface = Some(surface);
        self
    }

    /// Install the audio graph builder used during unlock
    pub fn with_graph_builder(mut self, builder: Box<dyn AudioGraphBuilder>) -> Self {
        self.state.unlocker.set_builder(builder);
        self
    }

    /// Attach (or replace) the playback surface
    ///
    /// After an unlock the new handles are primed and the audio graph is
    /// rebuilt around them. A waiting change is drained; otherwise a show
    /// that is already waiting or playing is re-applied to the new handles.
    pub async fn attach_surface(&mut self, surface: DualBuffer) -> Result<()> {
        let state = &mut self.state;
        if let Some(mut previous) = state.surface.replace(surface) {
            previous.release();
        }

        if state.unlocker.is_unlocked() {
            if let Some(surface) = state.surface.as_mut() {
                let report = state.unlocker.adopt_surface(surface).await;
                state.unlocker.set_gain(state.gain.gain());
                state.pending_events.push(ShowEvent::Unlocked { report });
            }
        }

        let observed_active = matches!(
            state.show_info.status(),
            ShowStatus::WaitingUntilStart | ShowStatus::Playing
        );
        if state.pending_change.is_none() && observed_active {
            state.pending_change = state.last_target.clone();
        }

        state.surface_replaced = true;
        state.drain_pending_change()
    }

    // ===== Inputs =====

    /// Handle a target delivered by the transport
    ///
    /// Invalid targets are rejected before they reach the diff memory.
    pub fn on_target_update(&mut self, target: TargetShowInfo) -> Result<()> {
        target.validate()?;
        self.state.target = Some(target);
        self.state.check_target(false)
    }

    /// Set volume (0-100)
    ///
    /// Before unlock there is no graph to mutate; the value is kept and
    /// applied once a graph is built.
    pub fn set_volume(&mut self, volume: f64) {
        let gain = self.state.gain.set_volume(volume);
        self.state.unlocker.set_gain(gain);
        self.state.pending_events.push(ShowEvent::VolumeChanged {
            volume: self.state.gain.volume(),
            gain,
        });
    }

    /// Unlock audio in response to a user gesture
    ///
    /// Never fails because of host quirks; afterwards the latest known
    /// target is applied even if the unlock itself achieved nothing. The
    /// `Unlocked` event is queued before that pass, so its report is still
    /// available through [`ShowController::drain_events`] when the pass
    /// returns a contract error.
    pub async fn initialize_audio(&mut self) -> Result<UnlockReport> {
        let state = &mut self.state;
        let report = state.unlocker.unlock(state.surface.as_mut()).await;
        state.unlocker.set_gain(state.gain.gain());
        state.pending_events.push(ShowEvent::Unlocked { report });

        state.check_target(true)?;
        Ok(report)
    }

    /// Route one input to its handler
    pub async fn dispatch(&mut self, event: ControllerEvent) -> Result<()> {
        match event {
            ControllerEvent::TargetUpdated(target) => self.on_target_update(target),
            ControllerEvent::VolumeChanged(volume) => {
                self.set_volume(volume);
                Ok(())
            }
            ControllerEvent::UnlockRequested => self.initialize_audio().await.map(|_| ()),
        }
    }

    /// Tear down the session, releasing the audio engine and handles
    pub fn dispose(self) {
        info!(status = %self.state.show_info.status(), "Disposing show controller");
    }

    // ===== State Queries =====

    /// Observed show state
    pub fn show_info(&self) -> &ShowInfo {
        &self.state.show_info
    }

    /// Observed show status
    pub fn status(&self) -> ShowStatus {
        self.state.show_info.status()
    }

    /// Last target that went through the diff
    pub fn last_target(&self) -> Option<&TargetShowInfo> {
        self.state.last_target.as_ref()
    }

    /// Whether a change is waiting for a playback surface
    pub fn has_pending_change(&self) -> bool {
        self.state.pending_change.is_some()
    }

    pub fn is_unlocked(&self) -> bool {
        self.state.unlocker.is_unlocked()
    }

    pub fn has_audio_graph(&self) -> bool {
        self.state.unlocker.has_graph()
    }

    /// Current volume (0-100)
    pub fn volume(&self) -> f64 {
        self.state.gain.volume()
    }

    /// Current linear gain
    pub fn gain(&self) -> f32 {
        self.state.gain.gain()
    }

    pub fn surface(&self) -> Option<&DualBuffer> {
        self.state.surface.as_ref()
    }

    pub fn surface_mut(&mut self) -> Option<&mut DualBuffer> {
        self.state.surface.as_mut()
    }

    // ===== Events =====

    /// Take all events emitted since the last call
    pub fn drain_events(&mut self) -> Vec<ShowEvent> {
        std::mem::take(&mut self.state.pending_events)
    }

    /// Check if there are pending events
    pub fn has_pending_events(&self) -> bool {
        !self.state.pending_events.is_empty()
    }
}

impl Default for ShowController {
    fn default() -> Self {
        Self::new(ControllerConfig::default())
    }
}
