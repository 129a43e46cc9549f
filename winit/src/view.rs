// SPDX-License-Identifier: MIT

//! Conversion of the dashboard state into the Slint view model.

use slint::{Color, ComponentHandle, ModelRc, SharedString, VecModel};

use hub_dashboard_common::bim::EntityProps;
use hub_dashboard_common::config::Config;
use hub_dashboard_common::dashboard::{Alert, Dashboard, NotifyChannel, Page};
use hub_dashboard_common::sensor::{
    Aggregation, Chart, ChartType, DateRange, Metric, MetricFilter, SensorRow, ROWS_PER_PAGE_OPTIONS,
};

use crate::{
    AppWindow, ChartBar, ChartData, ChartSeriesData, ElementItem, NavItem, PageKind, PluginItem, PropertyRow,
    SensorRowData, SummaryItem, ToggleItem, ViewModel,
};

/// Transient UI state that does not belong to the dashboard itself.
#[derive(Default)]
pub struct Feedback {
    pub notification: String,
    pub auth_error: String,
    pub auth_busy: bool,
    pub model_status: String,
    /// Selectable elements of the loaded model, listed once at load time.
    pub elements: Vec<EntityProps>,
}

fn model<T: Clone + 'static>(items: Vec<T>) -> ModelRc<T> {
    ModelRc::new(VecModel::from(items))
}

fn labels<'a>(items: impl IntoIterator<Item = &'a str>) -> ModelRc<SharedString> {
    model(items.into_iter().map(SharedString::from).collect())
}

fn color(rgb: u32) -> Color {
    Color::from_argb_encoded(0xff00_0000 | rgb)
}

fn date_text(instant: Option<chrono::DateTime<chrono::Utc>>) -> SharedString {
    instant
        .map(|instant| instant.format("%Y-%m-%d").to_string())
        .unwrap_or_default()
        .into()
}

impl From<Page> for PageKind {
    fn from(page: Page) -> Self {
        match page {
            Page::Login => PageKind::Login,
            Page::Register => PageKind::Register,
            Page::ForgotPassword => PageKind::ForgotPassword,
            Page::Home => PageKind::Home,
            Page::Sensors => PageKind::Sensors,
            Page::Analytics => PageKind::Analytics,
            Page::Bim => PageKind::Bim,
            Page::Extensions => PageKind::Extensions,
            Page::Settings => PageKind::Settings,
        }
    }
}

impl From<PageKind> for Page {
    fn from(kind: PageKind) -> Self {
        match kind {
            PageKind::Login => Page::Login,
            PageKind::Register => Page::Register,
            PageKind::ForgotPassword => Page::ForgotPassword,
            PageKind::Home => Page::Home,
            PageKind::Sensors => Page::Sensors,
            PageKind::Analytics => Page::Analytics,
            PageKind::Bim => Page::Bim,
            PageKind::Extensions => Page::Extensions,
            PageKind::Settings => Page::Settings,
        }
    }
}

impl From<&SensorRow> for SensorRowData {
    fn from(row: &SensorRow) -> Self {
        Self {
            name: row.name.as_str().into(),
            temperature: row.temperature.as_str().into(),
            humidity: row.humidity.as_str().into(),
            pressure: row.pressure.as_str().into(),
            last_updated: row.last_updated.as_str().into(),
        }
    }
}

impl From<&Chart> for ChartData {
    fn from(chart: &Chart) -> Self {
        let series = chart
            .series
            .iter()
            .map(|series| ChartSeriesData {
                label: series.metric.label().into(),
                color: color(series.metric.color()),
                commands: series.commands.as_str().into(),
                filled: chart.chart_type == ChartType::Area,
                bars: model(
                    series
                        .bars
                        .iter()
                        .map(|bar| ChartBar {
                            x: bar.x,
                            y: bar.y,
                            width: bar.width,
                            height: bar.height,
                        })
                        .collect(),
                ),
            })
            .collect();

        Self {
            empty: chart.is_empty(),
            min: format!("{:.1}", chart.min).into(),
            max: format!("{:.1}", chart.max).into(),
            first_label: chart.labels.first().cloned().unwrap_or_default().into(),
            last_label: chart.labels.last().cloned().unwrap_or_default().into(),
            series: model(series),
        }
    }
}

/// List entry of a model element. Ids beyond the range of a Slint `int` are
/// not selectable and yield `None`.
fn element_item(element: &EntityProps) -> Option<ElementItem> {
    Some(ElementItem {
        express_id: i32::try_from(element.express_id).ok()?,
        type_name: element.type_name.as_str().into(),
        name: element.name.clone().unwrap_or_default().into(),
        sensor: element.is_sensor_like(),
    })
}

/// Push the complete state into the view model.
pub fn render(ui: &AppWindow, dashboard: &mut Dashboard, feedback: &Feedback, config: &Config) {
    let vm = ui.global::<ViewModel>();

    vm.set_page(dashboard.shell.page().into());
    vm.set_navigation(model(
        Page::NAVIGATION
            .iter()
            .map(|&page| NavItem {
                page: page.into(),
                label: page.label().into(),
            })
            .collect(),
    ));
    vm.set_user(dashboard.session.user.clone().unwrap_or_default().into());
    vm.set_role(dashboard.session.role.clone().unwrap_or_default().into());
    vm.set_notification(feedback.notification.as_str().into());

    vm.set_auth_error(feedback.auth_error.as_str().into());
    vm.set_auth_busy(feedback.auth_busy);
    vm.set_reset_verified(dashboard.password_reset.is_verified());
    vm.set_reset_username(dashboard.password_reset.username().into());

    render_sensor_table(&vm, dashboard);
    vm.set_home_chart((&dashboard.home.chart()).into());
    vm.set_home_loading(dashboard.home.is_loading());
    render_analytics(&vm, dashboard);
    render_bim(&vm, dashboard, feedback);
    render_plugins(&vm, dashboard);
    render_settings(&vm, dashboard, config);
}

fn render_sensor_table(vm: &ViewModel, dashboard: &mut Dashboard) {
    let table = &mut dashboard.table;
    vm.set_sensor_rows(model(table.visible_rows().iter().map(SensorRowData::from).collect()));
    vm.set_page_summary(table.page_summary().into());
    vm.set_rows_per_page_options(model(
        ROWS_PER_PAGE_OPTIONS
            .iter()
            .map(|rows| SharedString::from(rows.to_string()))
            .collect(),
    ));
    vm.set_rows_per_page(table.pagination().rows_per_page().to_string().into());
    vm.set_sensors_loading(table.is_loading());
    vm.set_sensors_error(table.error().unwrap_or_default().into());
}

fn render_analytics(vm: &ViewModel, dashboard: &Dashboard) {
    let analytics = &dashboard.analytics;

    let mut sensors = dashboard.table.sensor_names();
    if let Some(selected) = analytics.sensor() {
        if !sensors.iter().any(|name| name == selected) {
            sensors.insert(0, selected.to_string());
        }
    }
    vm.set_sensor_names(labels(sensors.iter().map(String::as_str)));
    vm.set_selected_sensor(analytics.sensor().unwrap_or_default().into());

    vm.set_metric_options(labels(MetricFilter::labels()));
    vm.set_selected_metric(analytics.filter().label().into());
    vm.set_date_range_options(labels(DateRange::ALL.map(DateRange::label)));
    vm.set_selected_date_range(analytics.date_range().label().into());
    vm.set_custom_range_visible(analytics.date_range() == DateRange::Custom);
    let (start, end) = analytics.custom_range();
    vm.set_custom_start(date_text(start));
    vm.set_custom_end(date_text(end));
    vm.set_aggregation_options(labels(Aggregation::ALL.map(Aggregation::label)));
    vm.set_selected_aggregation(analytics.aggregation().label().into());

    vm.set_chart_switcher(dashboard.plugins.is_enabled(hub_dashboard_common::plugin::CHART_SWITCHER));
    vm.set_chart_type_options(labels(ChartType::ALL.map(ChartType::label)));
    vm.set_selected_chart_type(dashboard.plugins.chart_type().label().into());
    vm.set_analytics_chart((&dashboard.analytics_chart()).into());
    vm.set_analytics_loading(analytics.is_loading());

    let aggregation = analytics.aggregation().label();
    vm.set_summaries(model(
        analytics
            .summaries()
            .into_iter()
            .map(|(metric, value)| SummaryItem {
                label: format!("{aggregation} {}", metric.label()).into(),
                value: value
                    .map(|value| format!("{value:.2} {}", metric.unit()))
                    .unwrap_or_else(|| "-".to_string())
                    .into(),
                color: color(metric.color()),
            })
            .collect(),
    ));
}

fn render_bim(vm: &ViewModel, dashboard: &Dashboard, feedback: &Feedback) {
    let bim = &dashboard.bim;

    vm.set_model_status(feedback.model_status.as_str().into());
    vm.set_elements(model(
        feedback
            .elements
            .iter()
            .filter_map(element_item)
            .collect(),
    ));

    let selected = bim.selected();
    vm.set_properties_visible(selected.is_some());
    vm.set_pinned(bim.is_pinned());
    vm.set_properties(model(
        selected
            .map(|properties| properties.rows())
            .unwrap_or_default()
            .into_iter()
            .map(|(key, value)| PropertyRow {
                key: key.into(),
                value: value.into(),
            })
            .collect(),
    ));
    vm.set_bim_sensor(selected.is_some_and(|properties| properties.sensor));
    vm.set_bim_tabs(labels(Metric::ALL.map(Metric::label)));
    vm.set_bim_tab(bim.active_tab().label().into());
    vm.set_bim_chart((&dashboard.bim_chart()).into());
}

fn render_plugins(vm: &ViewModel, dashboard: &Dashboard) {
    vm.set_plugins(model(
        dashboard
            .plugins
            .list()
            .into_iter()
            .map(|(plugin, enabled)| PluginItem {
                name: plugin.name.into(),
                description: plugin.description.into(),
                enabled,
            })
            .collect(),
    ));
}

fn render_settings(vm: &ViewModel, dashboard: &Dashboard, config: &Config) {
    let settings = &dashboard.settings;
    vm.set_alerts(model(
        Alert::ALL
            .iter()
            .map(|&alert| ToggleItem {
                label: alert.label().into(),
                enabled: settings.alert_enabled(alert),
            })
            .collect(),
    ));
    vm.set_channels(model(
        NotifyChannel::ALL
            .iter()
            .map(|&channel| ToggleItem {
                label: channel.label().into(),
                enabled: settings.channel_enabled(channel),
            })
            .collect(),
    ));

    let refresh = match config.refresh_interval_secs {
        0 => "Off".to_string(),
        secs => format!("{secs} s"),
    };
    let source = if config.offline {
        "Built-in demo data".to_string()
    } else {
        config.api_base_url.clone()
    };
    vm.set_system_info(model(vec![
        PropertyRow {
            key: "Data refresh interval".into(),
            value: refresh.into(),
        },
        PropertyRow {
            key: "Sensor API".into(),
            value: source.into(),
        },
        PropertyRow {
            key: "Export directory".into(),
            value: config.export_dir().display().to_string().into(),
        },
    ]));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sensor(express_id: u32) -> EntityProps {
        EntityProps {
            express_id,
            type_name: "IFCSENSOR".to_string(),
            global_id: Some("1kTvXnbbzCWw8lcMd1dR4o".to_string()),
            name: Some("sensor1".to_string()),
        }
    }

    #[test]
    fn test_element_item() {
        let item = element_item(&sensor(11)).unwrap();
        assert_eq!(item.express_id, 11);
        assert_eq!(item.name, "sensor1");
        assert!(item.sensor);
    }

    #[test]
    fn test_element_item_skips_ids_beyond_int_range() {
        assert!(element_item(&sensor(i32::MAX as u32)).is_some());
        assert!(element_item(&sensor(i32::MAX as u32 + 1)).is_none());
        assert!(element_item(&sensor(u32::MAX)).is_none());
    }
}
