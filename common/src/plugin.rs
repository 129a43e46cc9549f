// SPDX-License-Identifier: MIT

//! Statically registered, user togglable dashboard widgets.

use std::collections::BTreeSet;

use crate::sensor::ChartType;

/// Name of the plugin that lets the user pick the analytics chart type.
pub const CHART_SWITCHER: &str = "ChartSwitcher";

/// Static description of a plugin.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PluginMeta {
    pub name: &'static str,
    pub description: &'static str,
}

/// Every plugin the dashboard knows. New plugins are added here.
pub const PLUGINS: &[PluginMeta] = &[PluginMeta {
    name: CHART_SWITCHER,
    description: "Switch the analytics chart between line, bar and area.",
}];

pub fn find_plugin(name: &str) -> Option<&'static PluginMeta> {
    PLUGINS.iter().find(|plugin| plugin.name == name)
}

/// Which plugins are enabled, plus the chart type the switcher drives.
///
/// Starts empty for every session and is never persisted.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PluginState {
    enabled: BTreeSet<&'static str>,
    chart_type: ChartType,
}

impl PluginState {
    pub fn is_enabled(&self, name: &str) -> bool {
        self.enabled.contains(name)
    }

    /// Enables or disables a plugin. Disabling the chart switcher puts the
    /// chart back to a line chart. Unknown names are ignored.
    pub fn toggle(&mut self, name: &str) {
        let Some(plugin) = find_plugin(name) else {
            log::warn!("Ignoring toggle of unknown plugin {name:?}");
            return;
        };

        if self.enabled.remove(plugin.name) {
            log::info!("Disabled plugin {}", plugin.name);
            if plugin.name == CHART_SWITCHER {
                self.chart_type = ChartType::Line;
            }
        } else {
            log::info!("Enabled plugin {}", plugin.name);
            self.enabled.insert(plugin.name);
        }
    }

    pub fn chart_type(&self) -> ChartType {
        self.chart_type
    }

    pub fn set_chart_type(&mut self, chart_type: ChartType) {
        self.chart_type = chart_type;
    }

    /// The chart type actually drawn: without the switcher it is always a line.
    pub fn effective_chart_type(&self) -> ChartType {
        if self.is_enabled(CHART_SWITCHER) {
            self.chart_type
        } else {
            ChartType::Line
        }
    }

    /// The registry together with the enabled flag, for listing.
    pub fn list(&self) -> Vec<(&'static PluginMeta, bool)> {
        PLUGINS.iter().map(|plugin| (plugin, self.is_enabled(plugin.name))).collect()
    }
}
