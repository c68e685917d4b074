//! Browsing the catalog and handing the chosen scenario to a player.

use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

use crate::{
    catalog::ScenarioCatalog,
    error::{LibraryError, PlaybackError},
    machine::Stage,
    outcome::OutcomeSummary,
    player::{PlaybackEvent, ScenarioPlayer},
    scenario::{BusinessType, Scenario, ScenarioCategory},
    telemetry::PlaybackTelemetry,
    timing::TimingConfig,
};

/// Optional business type and category constraints.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LibraryFilter {
    /// Required business type.
    pub business: Option<BusinessType>,
    /// Required category.
    pub category: Option<ScenarioCategory>,
}

impl LibraryFilter {
    /// Restricts to `business`.
    #[must_use]
    pub const fn business(mut self, business: BusinessType) -> Self {
        self.business = Some(business);
        self
    }

    /// Restricts to `category`.
    #[must_use]
    pub const fn category(mut self, category: ScenarioCategory) -> Self {
        self.category = Some(category);
        self
    }

    /// Drops both constraints.
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Whether any constraint is set.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.business.is_some() || self.category.is_some()
    }

    /// Matching scenarios in catalog order.
    #[must_use]
    pub fn apply<'a>(&self, catalog: &'a ScenarioCatalog) -> Vec<&'a Arc<Scenario>> {
        catalog.filter(self.business, self.category)
    }
}

/// Which screen the browser shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LibraryView {
    /// Scenario grid.
    Browsing,
    /// Player for the selected scenario.
    Playing,
    /// Outcome of the selected scenario.
    Completed,
}

/// Catalog browser owning at most one player.
#[derive(Debug)]
pub struct ScenarioBrowser<'c> {
    catalog: &'c ScenarioCatalog,
    filter: LibraryFilter,
    view: LibraryView,
    timing: TimingConfig,
    telemetry: Option<PlaybackTelemetry>,
    player: Option<ScenarioPlayer>,
}

impl<'c> ScenarioBrowser<'c> {
    /// Browser over `catalog` whose players use `timing`. Fails if `timing` is invalid.
    pub fn new(catalog: &'c ScenarioCatalog, timing: TimingConfig) -> Result<Self, PlaybackError> {
        timing.validate()?;
        Ok(Self {
            catalog,
            filter: LibraryFilter::default(),
            view: LibraryView::Browsing,
            timing,
            telemetry: None,
            player: None,
        })
    }

    /// Attaches telemetry to every player the browser creates.
    #[must_use]
    pub fn with_telemetry(mut self, telemetry: PlaybackTelemetry) -> Self {
        self.telemetry = Some(telemetry);
        self
    }

    /// Replaces the filter.
    pub fn set_filter(&mut self, filter: LibraryFilter) {
        self.filter = filter;
    }

    /// Current filter.
    #[must_use]
    pub const fn filter(&self) -> &LibraryFilter {
        &self.filter
    }

    /// Mutable filter for incremental edits.
    pub fn filter_mut(&mut self) -> &mut LibraryFilter {
        &mut self.filter
    }

    /// Scenarios shown in the grid.
    #[must_use]
    pub fn visible(&self) -> Vec<&'c Arc<Scenario>> {
        self.filter.apply(self.catalog)
    }

    /// Current screen.
    #[must_use]
    pub const fn view(&self) -> LibraryView {
        self.view
    }

    /// Opens the player on `id`. The existing player is reused through `load`,
    /// so timers of the previous scenario are dropped. Playback is not started.
    pub fn select(&mut self, id: &str) -> Result<&mut ScenarioPlayer, LibraryError> {
        let scenario = self
            .catalog
            .get(id)
            .cloned()
            .ok_or_else(|| LibraryError::UnknownScenario(id.to_string()))?;
        let player = match self.player.take() {
            Some(mut player) => {
                player.load(scenario);
                player
            }
            None => self.new_player(scenario)?,
        };
        debug!(scenario = id, "scenario selected");
        self.view = LibraryView::Playing;
        Ok(self.player.insert(player))
    }

    fn new_player(&self, scenario: Arc<Scenario>) -> Result<ScenarioPlayer, LibraryError> {
        let mut builder = ScenarioPlayer::builder(scenario).timing(self.timing.clone());
        if let Some(telemetry) = &self.telemetry {
            builder = builder.telemetry(telemetry.clone());
        }
        Ok(builder.build()?)
    }

    /// Back to the grid; the player and its timers are dropped.
    pub fn close(&mut self) {
        self.player = None;
        self.view = LibraryView::Browsing;
    }

    /// From the outcome screen back to the player of the same scenario.
    pub fn back_to_player(&mut self) -> Result<(), LibraryError> {
        if self.player.is_none() {
            return Err(LibraryError::NoSelection);
        }
        self.view = LibraryView::Playing;
        Ok(())
    }

    /// Feeds player events back into the view state: completion shows the outcome.
    pub fn observe(&mut self, events: &[PlaybackEvent]) {
        for event in events {
            if let PlaybackEvent::StageChanged { to, .. } = event {
                match to {
                    Stage::Complete if self.view == LibraryView::Playing => {
                        self.view = LibraryView::Completed;
                    }
                    Stage::Playing if self.view == LibraryView::Completed => {
                        self.view = LibraryView::Playing;
                    }
                    _ => {}
                }
            }
        }
    }

    /// Player of the selected scenario.
    #[must_use]
    pub const fn player(&self) -> Option<&ScenarioPlayer> {
        self.player.as_ref()
    }

    /// Mutable player of the selected scenario.
    pub fn player_mut(&mut self) -> Option<&mut ScenarioPlayer> {
        self.player.as_mut()
    }

    /// Outcome card of the selected scenario, once its playback completed.
    #[must_use]
    pub fn outcome(&self) -> Option<OutcomeSummary> {
        if self.view != LibraryView::Completed {
            return None;
        }
        self.player
            .as_ref()
            .map(|player| OutcomeSummary::from(&player.scenario().outcome))
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn browser() -> ScenarioBrowser<'static> {
        ScenarioBrowser::new(ScenarioCatalog::builtin(), TimingConfig::with_rate(1000.0)).unwrap()
    }

    #[test]
    fn filter_narrows_and_clears() {
        let mut b = browser();
        let all = b.visible().len();
        b.set_filter(LibraryFilter::default().business(BusinessType::Plumbing));
        assert!(b.filter().is_active());
        assert!(b.visible().len() < all);
        b.filter_mut().category = Some(ScenarioCategory::Pricing);
        let ids: Vec<_> = b.visible().iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["plumbing-pricing"]);
        b.filter_mut().clear();
        assert!(!b.filter().is_active());
        assert_eq!(b.visible().len(), all);
    }

    #[test]
    fn unknown_selection_leaves_browser_untouched() {
        let mut b = browser();
        let err = b.select("nope").unwrap_err();
        assert_eq!(err, LibraryError::UnknownScenario("nope".into()));
        assert_eq!(b.view(), LibraryView::Browsing);
        assert!(b.player().is_none());
        assert_eq!(b.back_to_player(), Err(LibraryError::NoSelection));
    }

    #[test]
    fn completion_switches_to_outcome_and_back() {
        let mut b = browser();
        let player = b.select("hvac-emergency").unwrap();
        assert_eq!(player.stage(), Stage::Idle);
        let mut events = player.start();
        events.extend(player.run_to_end());
        b.observe(&events);
        assert_eq!(b.view(), LibraryView::Completed);
        let summary = b.outcome().unwrap();
        assert_eq!(summary.headline, "Emergency Tech Dispatched");
        b.back_to_player().unwrap();
        assert_eq!(b.view(), LibraryView::Playing);
        assert!(b.outcome().is_none());
        b.close();
        assert_eq!(b.view(), LibraryView::Browsing);
        assert!(b.player().is_none());
    }

    #[test]
    fn reselecting_reuses_player_without_leaking_timers() {
        let mut b = browser();
        let player = b.select("plumbing-emergency").unwrap();
        player.start();
        player.advance_by(Duration::from_millis(5));
        assert!(player.pending_timers() > 0);
        let player = b.select("dental-new-patient").unwrap();
        assert_eq!(player.pending_timers(), 0);
        assert_eq!(player.stage(), Stage::Idle);
        assert_eq!(player.scenario().id, "dental-new-patient");
        assert!(player.machine().session() > 1);
    }
}
