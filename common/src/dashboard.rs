// SPDX-License-Identifier: MIT

//! Page level state of the dashboard. Every method here runs on the UI
//! thread; blocking API calls happen elsewhere and come back through the
//! `apply_*` methods.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Months, Utc};

use crate::api::{ApiError, FetchOutcome, LoginResponse, RequestSequence, Ticket};
use crate::auth::{PasswordResetFlow, Session};
use crate::bim::{BimViewer, IfcModel};
use crate::config::Config;
use crate::plugin::PluginState;
use crate::sensor::{
    chart_rows, export_csv, export_svg, metric_rows, recent_day, sensor_rows, time_of_day_rows, transform,
    Aggregation, Chart, ChartRow, ChartType, DateRange, ExportError, Metric, MetricFilter, Pagination, RawReading,
    SensorList, SensorRow, SensorSeries, TimeWindow,
};

/// Sensor shown on the home page.
pub const HOME_SENSOR: &str = "sensor1";
/// Sensor preselected on the analytics page.
pub const DEFAULT_ANALYTICS_SENSOR: &str = "Sensor A";

const CSV_EXPORT_FILE: &str = "sensor_data.csv";
const SVG_EXPORT_FILE: &str = "chart.svg";
const SVG_EXPORT_SIZE: (u32, u32) = (1200, 600);

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Page {
    #[default]
    Login,
    Register,
    ForgotPassword,
    Home,
    Sensors,
    Analytics,
    Bim,
    Extensions,
    Settings,
}

impl Page {
    /// Entries of the side navigation, in display order.
    pub const NAVIGATION: [Page; 6] = [
        Page::Home,
        Page::Sensors,
        Page::Analytics,
        Page::Bim,
        Page::Extensions,
        Page::Settings,
    ];

    pub fn is_protected(self) -> bool {
        !matches!(self, Page::Login | Page::Register | Page::ForgotPassword)
    }

    pub fn label(self) -> &'static str {
        match self {
            Page::Login => "Login",
            Page::Register => "Register",
            Page::ForgotPassword => "Forgot Password",
            Page::Home => "Dashboard",
            Page::Sensors => "Sensors",
            Page::Analytics => "Analytics",
            Page::Bim => "BIM",
            Page::Extensions => "Extensions",
            Page::Settings => "Settings",
        }
    }
}

/// The page currently shown.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Shell {
    page: Page,
}

impl Shell {
    pub fn page(&self) -> Page {
        self.page
    }

    /// Protected pages redirect to the login page while not authenticated.
    /// Returns the page actually shown.
    pub fn navigate(&mut self, page: Page, authenticated: bool) -> Page {
        self.page = if page.is_protected() && !authenticated {
            log::debug!("Redirecting {} to login", page.label());
            Page::Login
        } else {
            page
        };
        self.page
    }
}

/// The sensor overview table with its latest readings.
#[derive(Clone, Debug, Default)]
pub struct SensorTable {
    list: SensorList,
    rows: Vec<SensorRow>,
    loading: bool,
    error: Option<String>,
    pagination: Pagination,
    requests: RequestSequence,
}

impl SensorTable {
    pub fn new(rows_per_page: usize) -> Self {
        Self {
            pagination: Pagination::new(rows_per_page),
            ..Self::default()
        }
    }

    pub fn begin_refresh(&mut self) -> Ticket {
        self.loading = true;
        self.requests.begin()
    }

    /// Store a refresh result. A failed refresh keeps the previous rows.
    /// Returns `false` for the result of a superseded refresh, which is dropped.
    pub fn apply(&mut self, ticket: Ticket, result: Result<SensorList, ApiError>) -> bool {
        if !self.requests.is_current(ticket) {
            return false;
        }
        self.loading = false;
        match result {
            Ok(list) => {
                self.rows = sensor_rows(&list);
                self.list = list;
                self.error = None;
            }
            Err(error) => {
                log::warn!("Failed to fetch sensors: {error}");
                self.error = Some(error.to_string());
            }
        }
        true
    }

    /// Drop all rows and outstanding refreshes. The page size is kept.
    pub fn reset(&mut self) {
        let mut requests = std::mem::take(&mut self.requests);
        requests.invalidate();
        *self = Self {
            requests,
            ..Self::new(self.pagination.rows_per_page())
        };
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn list(&self) -> &SensorList {
        &self.list
    }

    pub fn sensor_names(&self) -> Vec<String> {
        self.list.keys().cloned().collect()
    }

    pub fn rows(&self) -> &[SensorRow] {
        &self.rows
    }

    /// Rows on the current page.
    pub fn visible_rows(&mut self) -> &[SensorRow] {
        self.pagination.slice(&self.rows)
    }

    pub fn pagination(&self) -> &Pagination {
        &self.pagination
    }

    pub fn next_page(&mut self) {
        self.pagination.next(self.rows.len());
    }

    pub fn previous_page(&mut self) {
        self.pagination.previous();
    }

    pub fn set_rows_per_page(&mut self, rows_per_page: usize) {
        self.pagination.set_rows_per_page(rows_per_page);
    }

    /// "1-5 of 12" style summary of the current page.
    pub fn page_summary(&self) -> String {
        let total = self.rows.len();
        if total == 0 {
            return "0 of 0".to_string();
        }
        let page = self.pagination.page().min(self.pagination.page_count(total) - 1);
        let first = page * self.pagination.rows_per_page() + 1;
        let last = (first - 1 + self.pagination.rows_per_page()).min(total);
        format!("{first}-{last} of {total}")
    }
}

/// Last 24 hours of the home sensor.
#[derive(Clone, Debug, Default)]
pub struct HomeState {
    series: SensorSeries,
    loading: bool,
    requests: RequestSequence,
}

impl HomeState {
    pub fn begin_fetch(&mut self) -> (Ticket, &'static str) {
        self.loading = true;
        (self.requests.begin(), HOME_SENSOR)
    }

    pub fn apply_fetch(&mut self, ticket: Ticket, result: Result<Vec<RawReading>, ApiError>) -> FetchOutcome {
        if !self.requests.is_current(ticket) {
            return FetchOutcome::Stale;
        }
        self.loading = false;
        match result {
            Ok(readings) => {
                self.series = recent_day(&readings);
                if self.series.has_data() {
                    FetchOutcome::Plotted
                } else {
                    FetchOutcome::NoData
                }
            }
            Err(error) => {
                log::warn!("Failed to fetch {HOME_SENSOR}: {error}");
                self.series.clear();
                FetchOutcome::Failed(error)
            }
        }
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn series(&self) -> &SensorSeries {
        &self.series
    }

    /// Readings grouped by time of day, so the x axis runs from midnight on.
    pub fn chart(&self) -> Chart {
        Chart::build(&time_of_day_rows(&self.series), MetricFilter::All, ChartType::Line)
    }

    /// Back to the initial state. Fetches still in flight become stale.
    pub fn reset(&mut self) {
        let mut requests = std::mem::take(&mut self.requests);
        requests.invalidate();
        *self = Self {
            requests,
            ..Self::default()
        };
    }
}

/// Selection and plotted data of the analytics page.
#[derive(Clone, Debug)]
pub struct AnalyticsState {
    filter: MetricFilter,
    sensor: Option<String>,
    date_range: DateRange,
    custom_start: Option<DateTime<Utc>>,
    custom_end: Option<DateTime<Utc>>,
    aggregation: Aggregation,
    series: SensorSeries,
    loading: bool,
    requests: RequestSequence,
}

impl AnalyticsState {
    /// The custom range starts out as the six months before `now`.
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            filter: MetricFilter::All,
            sensor: Some(DEFAULT_ANALYTICS_SENSOR.to_string()),
            date_range: DateRange::default(),
            custom_start: now.checked_sub_months(Months::new(6)),
            custom_end: Some(now),
            aggregation: Aggregation::default(),
            series: SensorSeries::default(),
            loading: false,
            requests: RequestSequence::default(),
        }
    }

    /// Back to the selection of a fresh page. Fetches still in flight become stale.
    pub fn reset(&mut self, now: DateTime<Utc>) {
        let mut requests = std::mem::take(&mut self.requests);
        requests.invalidate();
        *self = Self {
            requests,
            ..Self::new(now)
        };
    }

    pub fn filter(&self) -> MetricFilter {
        self.filter
    }

    pub fn set_filter(&mut self, filter: MetricFilter) {
        self.filter = filter;
    }

    pub fn sensor(&self) -> Option<&str> {
        self.sensor.as_deref()
    }

    /// Picking another sensor shows all metrics again.
    pub fn select_sensor(&mut self, sensor: Option<String>) {
        self.sensor = sensor.filter(|name| !name.is_empty());
        self.filter = MetricFilter::All;
    }

    pub fn date_range(&self) -> DateRange {
        self.date_range
    }

    pub fn set_date_range(&mut self, date_range: DateRange) {
        self.date_range = date_range;
    }

    pub fn custom_range(&self) -> (Option<DateTime<Utc>>, Option<DateTime<Utc>>) {
        (self.custom_start, self.custom_end)
    }

    pub fn set_custom_range(&mut self, start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) {
        self.custom_start = start;
        self.custom_end = end;
    }

    pub fn aggregation(&self) -> Aggregation {
        self.aggregation
    }

    pub fn set_aggregation(&mut self, aggregation: Aggregation) {
        self.aggregation = aggregation;
    }

    pub fn window(&self) -> TimeWindow {
        self.date_range.window(self.custom_start, self.custom_end)
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn series(&self) -> &SensorSeries {
        &self.series
    }

    pub fn has_data(&self) -> bool {
        self.series.has_data()
    }

    /// Start a fetch for the selected sensor. Without a sensor the chart is
    /// emptied and nothing is fetched.
    pub fn begin_fetch(&mut self) -> Option<(Ticket, String)> {
        let ticket = self.requests.begin();
        let Some(sensor) = self.sensor.clone() else {
            self.series.clear();
            self.loading = false;
            return None;
        };
        self.loading = true;
        Some((ticket, sensor))
    }

    /// Apply a fetch result, filtered by the window as of `now`.
    pub fn apply_fetch(
        &mut self,
        ticket: Ticket,
        result: Result<Vec<RawReading>, ApiError>,
        now: DateTime<Utc>,
    ) -> FetchOutcome {
        if !self.requests.is_current(ticket) {
            return FetchOutcome::Stale;
        }
        self.loading = false;
        match result {
            Ok(readings) => {
                self.series = transform(&readings, &self.window(), now);
                log::debug!("Plotting {} points for {:?}", self.series.len(), self.sensor);
                if self.series.has_data() {
                    FetchOutcome::Plotted
                } else {
                    FetchOutcome::NoData
                }
            }
            Err(error) => {
                log::warn!("Failed to fetch {:?}: {error}", self.sensor);
                self.series.clear();
                FetchOutcome::Failed(error)
            }
        }
    }

    pub fn chart_rows(&self) -> Vec<ChartRow> {
        chart_rows(&self.series)
    }

    pub fn chart(&self, chart_type: ChartType) -> Chart {
        Chart::build(&self.chart_rows(), self.filter, chart_type)
    }

    /// The selected statistic for each visible metric.
    pub fn summaries(&self) -> Vec<(Metric, Option<f64>)> {
        self.filter
            .metrics()
            .into_iter()
            .map(|metric| (metric, self.aggregation.apply(self.series.get(metric))))
            .collect()
    }

    /// Write the plotted rows to `sensor_data.csv` in `dir`.
    pub fn export_csv(&self, dir: &Path) -> Result<PathBuf, ExportError> {
        let rows = self.chart_rows();
        if rows.is_empty() {
            return Err(ExportError::NoData);
        }
        let path = dir.join(CSV_EXPORT_FILE);
        export_csv(&rows, std::fs::File::create(&path)?)?;
        log::info!("Exported {} rows to {}", rows.len(), path.display());
        Ok(path)
    }

    /// Write the current chart to `chart.svg` in `dir`.
    pub fn export_image(&self, dir: &Path, chart_type: ChartType) -> Result<PathBuf, ExportError> {
        let chart = self.chart(chart_type);
        if chart.is_empty() {
            return Err(ExportError::NoData);
        }
        let path = dir.join(SVG_EXPORT_FILE);
        let (width, height) = SVG_EXPORT_SIZE;
        export_svg(&chart, width, height, std::fs::File::create(&path)?)?;
        log::info!("Exported chart to {}", path.display());
        Ok(path)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Alert {
    HighTemperature,
    LowTemperature,
    HighHumidity,
    LowHumidity,
    HighPressure,
    LowPressure,
    Battery,
}

impl Alert {
    pub const ALL: [Alert; 7] = [
        Alert::HighTemperature,
        Alert::LowTemperature,
        Alert::HighHumidity,
        Alert::LowHumidity,
        Alert::HighPressure,
        Alert::LowPressure,
        Alert::Battery,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Alert::HighTemperature => "High-temperature alert",
            Alert::LowTemperature => "Low-temperature alert",
            Alert::HighHumidity => "High-humidity alert",
            Alert::LowHumidity => "Low-humidity alert",
            Alert::HighPressure => "High-pressure alert",
            Alert::LowPressure => "Low-pressure alert",
            Alert::Battery => "Battery alert",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NotifyChannel {
    Email,
    Sms,
    Push,
}

impl NotifyChannel {
    pub const ALL: [NotifyChannel; 3] = [NotifyChannel::Email, NotifyChannel::Sms, NotifyChannel::Push];

    pub fn label(self) -> &'static str {
        match self {
            NotifyChannel::Email => "Email",
            NotifyChannel::Sms => "SMS",
            NotifyChannel::Push => "Push notification",
        }
    }
}

/// Alert and notification switches. They only live for the session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SettingsState {
    alerts: [bool; Alert::ALL.len()],
    channels: [bool; NotifyChannel::ALL.len()],
}

impl Default for SettingsState {
    fn default() -> Self {
        Self {
            alerts: [false; Alert::ALL.len()],
            channels: [true, false, true],
        }
    }
}

impl SettingsState {
    pub fn alert_enabled(&self, alert: Alert) -> bool {
        self.alerts[alert as usize]
    }

    pub fn toggle_alert(&mut self, alert: Alert) {
        self.alerts[alert as usize] ^= true;
    }

    pub fn channel_enabled(&self, channel: NotifyChannel) -> bool {
        self.channels[channel as usize]
    }

    pub fn toggle_channel(&mut self, channel: NotifyChannel) {
        self.channels[channel as usize] ^= true;
    }
}

/// Everything the dashboard shows, owned by the UI thread.
pub struct Dashboard {
    pub session: Session,
    pub shell: Shell,
    pub plugins: PluginState,
    pub table: SensorTable,
    pub home: HomeState,
    pub analytics: AnalyticsState,
    pub bim: BimViewer<IfcModel>,
    pub settings: SettingsState,
    pub password_reset: PasswordResetFlow,
}

impl Dashboard {
    pub fn new(config: &Config, now: DateTime<Utc>) -> Self {
        Self {
            session: Session::default(),
            shell: Shell::default(),
            plugins: PluginState::default(),
            table: SensorTable::new(config.rows_per_page),
            home: HomeState::default(),
            analytics: AnalyticsState::new(now),
            bim: BimViewer::default(),
            settings: SettingsState::default(),
            password_reset: PasswordResetFlow::default(),
        }
    }

    pub fn navigate(&mut self, page: Page) -> Page {
        self.shell.navigate(page, self.session.is_authenticated())
    }

    /// Store the session of a successful login and open the home page.
    pub fn complete_login(&mut self, response: LoginResponse) -> Page {
        self.session.establish(response);
        self.navigate(Page::Home)
    }

    /// Forget the session and everything fetched with it. The next login
    /// starts with no plugins enabled, and responses to requests issued before
    /// the logout are dropped.
    pub fn logout(&mut self, now: DateTime<Utc>) -> Page {
        self.session.logout();
        self.plugins = PluginState::default();
        self.table.reset();
        self.home.reset();
        self.analytics.reset(now);
        self.bim.clear_selection();
        self.password_reset = PasswordResetFlow::default();
        self.navigate(Page::Login)
    }

    /// Chart type of the analytics page after plugin gating.
    pub fn analytics_chart(&self) -> Chart {
        self.analytics.chart(self.plugins.effective_chart_type())
    }

    /// BIM sensor chart for the active tab.
    pub fn bim_chart(&self) -> Chart {
        let metric = self.bim.active_tab();
        Chart::build(
            &metric_rows(self.bim.series(), metric),
            MetricFilter::Only(metric),
            ChartType::Line,
        )
    }
}
