// Prevent console window in addition to Slint window in Windows release builds when, e.g., starting the app via file manager. Ignored on other platforms.
#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

slint::include_modules!();

mod view;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::Utc;

use hub_dashboard_common::api::{
    DummySensorApi, FetchOutcome, HttpSensorApi, LoginResponse, SensorApi, SensorApiSharedPointer,
};
use hub_dashboard_common::auth::{login_request, register_request, LoginError, PasswordResetFlow, ResetError};
use hub_dashboard_common::bim::{IfcModel, ModelSource};
use hub_dashboard_common::config::Config;
use hub_dashboard_common::dashboard::{Alert, Dashboard, NotifyChannel, Page};
use hub_dashboard_common::sensor::{parse_timestamp, Aggregation, ChartType, DateRange, Metric, MetricFilter};

use view::Feedback;

/// Dashboard state plus what the view shows besides it.
struct Shared {
    dashboard: Dashboard,
    feedback: Feedback,
}

/// Everything a callback needs: the window, the API and the shared state.
///
/// Cloned into every callback. API calls run on a thread of their own and
/// hand their result back to the event loop.
#[derive(Clone)]
struct Context {
    ui: slint::Weak<AppWindow>,
    api: SensorApiSharedPointer,
    shared: Arc<Mutex<Shared>>,
    config: Arc<Config>,
}

impl Context {
    fn lock(&self) -> MutexGuard<'_, Shared> {
        self.shared.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Update the state and redraw.
    fn update(&self, f: impl FnOnce(&mut Shared)) {
        f(&mut self.lock());
        self.render();
    }

    fn render(&self) {
        let Some(ui) = self.ui.upgrade() else {
            return;
        };
        let mut shared = self.lock();
        let Shared { dashboard, feedback } = &mut *shared;
        view::render(&ui, dashboard, feedback, &self.config);
    }

    fn notify(&self, message: impl Into<String>) {
        let message = message.into();
        log::info!("{message}");
        self.update(|shared| shared.feedback.notification = message);
    }

    /// Run a blocking API call on a worker thread, then `done` on the UI thread.
    fn background<T, J, D>(&self, job: J, done: D)
    where
        T: Send + 'static,
        J: FnOnce(&dyn SensorApi) -> T + Send + 'static,
        D: FnOnce(&Context, T) + Send + 'static,
    {
        let ctx = self.clone();
        std::thread::spawn(move || {
            let result = job(ctx.api.as_ref());
            let ui = ctx.ui.clone();
            if let Err(e) = ui.upgrade_in_event_loop(move |_| done(&ctx, result)) {
                log::warn!("Dropping API result, event loop is gone: {e}");
            }
        });
    }

    fn navigate(&self, page: Page) {
        let shown = self.lock().dashboard.navigate(page);
        self.update(|shared| shared.feedback.auth_error.clear());

        match shown {
            Page::Home => self.fetch_home(),
            Page::Sensors => self.refresh_sensors(),
            Page::Analytics => {
                self.refresh_sensors();
                self.fetch_analytics();
            }
            _ => {}
        }
    }

    fn login(&self, username: String, password: String) {
        self.update(|shared| {
            shared.feedback.auth_busy = true;
            shared.feedback.auth_error.clear();
        });
        self.background(
            move |api| login_request(api, &username, &password),
            |ctx, result| ctx.complete_login(result),
        );
    }

    fn register(&self, username: String, password: String) {
        self.update(|shared| {
            shared.feedback.auth_busy = true;
            shared.feedback.auth_error.clear();
        });
        self.background(
            move |api| register_request(api, &username, &password),
            |ctx, result| ctx.complete_login(result),
        );
    }

    fn complete_login(&self, result: Result<LoginResponse, LoginError>) {
        let mut shared = self.lock();
        shared.feedback.auth_busy = false;
        match result {
            Ok(response) => {
                shared.dashboard.complete_login(response);
                drop(shared);
                self.navigate(Page::Home);
            }
            Err(e) => {
                shared.feedback.auth_error = e.to_string();
                drop(shared);
                self.render();
            }
        }
    }

    fn verify_username(&self, username: String) {
        self.update(|shared| {
            shared.feedback.auth_busy = true;
            shared.feedback.auth_error.clear();
        });
        let probe = username.clone();
        self.background(
            move |api| PasswordResetFlow::verify_request(api, &probe),
            move |ctx, result| {
                ctx.update(|shared| {
                    shared.feedback.auth_busy = false;
                    if let Err(e) = shared.dashboard.password_reset.complete_verification(&username, result) {
                        shared.feedback.auth_error = e.to_string();
                    }
                })
            },
        );
    }

    fn reset_password(&self, new_password: String, confirm_password: String) {
        let mut shared = self.lock();
        let flow = &shared.dashboard.password_reset;
        let username = flow.username().to_string();
        let checked = if flow.is_verified() {
            PasswordResetFlow::check_passwords(&new_password, &confirm_password)
        } else {
            Err(ResetError::NotVerified)
        };
        let accepted = match checked {
            Ok(()) => {
                shared.feedback.auth_busy = true;
                shared.feedback.auth_error.clear();
                true
            }
            Err(e) => {
                shared.feedback.auth_error = e.to_string();
                false
            }
        };
        drop(shared);
        self.render();
        if !accepted {
            return;
        }

        self.background(
            move |api| PasswordResetFlow::reset_request(api, &username, &new_password),
            |ctx, result| {
                let result = {
                    let mut shared = ctx.lock();
                    shared.feedback.auth_busy = false;
                    let result = shared.dashboard.password_reset.complete_reset(result);
                    if let Err(e) = &result {
                        shared.feedback.auth_error = e.to_string();
                    }
                    result
                };
                match result {
                    Ok(()) => {
                        ctx.navigate(Page::Login);
                        ctx.notify("Password reset. Please log in.");
                    }
                    Err(_) => ctx.render(),
                }
            },
        );
    }

    fn logout(&self) {
        self.update(|shared| {
            shared.dashboard.logout(Utc::now());
            shared.feedback.notification.clear();
        });
    }

    fn refresh_sensors(&self) {
        let (ticket, token) = {
            let mut shared = self.lock();
            if shared.dashboard.table.is_loading() {
                return;
            }
            (shared.dashboard.table.begin_refresh(), shared.dashboard.session.token.clone())
        };
        self.render();

        self.background(
            move |api| api.sensors(token.as_deref()),
            move |ctx, result| {
                ctx.update(|shared| {
                    if !shared.dashboard.table.apply(ticket, result) {
                        log::debug!("Dropping a superseded sensor list");
                    }
                })
            },
        );
    }

    fn fetch_home(&self) {
        let (ticket, sensor) = self.lock().dashboard.home.begin_fetch();
        self.render();

        self.background(
            move |api| api.sensor_data(sensor),
            move |ctx, result| {
                ctx.update(|shared| {
                    shared.dashboard.home.apply_fetch(ticket, result);
                })
            },
        );
    }

    fn fetch_analytics(&self) {
        let request = self.lock().dashboard.analytics.begin_fetch();
        self.render();
        let Some((ticket, sensor)) = request else {
            return;
        };

        self.background(
            move |api| api.sensor_data(&sensor),
            move |ctx, result| {
                let outcome = ctx.lock().dashboard.analytics.apply_fetch(ticket, result, Utc::now());
                match outcome {
                    FetchOutcome::NoData => ctx.notify("No data to plot."),
                    FetchOutcome::Failed(e) => ctx.notify(format!("Failed to load sensor data: {e}")),
                    FetchOutcome::Plotted | FetchOutcome::Stale => ctx.render(),
                }
            },
        );
    }

    fn export_csv(&self) {
        let result = self.lock().dashboard.analytics.export_csv(&self.config.export_dir());
        match result {
            Ok(path) => self.notify(format!("Exported {}", path.display())),
            Err(e) => self.notify(e.to_string()),
        }
    }

    fn export_image(&self) {
        let result = {
            let shared = self.lock();
            let chart_type = shared.dashboard.plugins.effective_chart_type();
            shared.dashboard.analytics.export_image(&self.config.export_dir(), chart_type)
        };
        match result {
            Ok(path) => self.notify(format!("Exported {}", path.display())),
            Err(e) => self.notify(format!("Failed to export chart image: {e}")),
        }
    }

    fn select_element(&self, express_id: u32) {
        let request = {
            let mut shared = self.lock();
            let bim = &mut shared.dashboard.bim;
            bim.select(&[express_id]);
            bim.begin_fetch()
        };
        self.render();
        let Some((ticket, sensor)) = request else {
            return;
        };

        self.background(
            move |api| api.sensor_data(&sensor),
            move |ctx, result| {
                ctx.update(|shared| {
                    if let FetchOutcome::NoData = shared.dashboard.bim.apply_fetch(ticket, result) {
                        log::debug!("No readings for the selected sensor");
                    }
                })
            },
        );
    }

    /// Open the configured IFC model, if any.
    fn load_model(&self) {
        let Some(path) = self.config.model_path.clone() else {
            self.update(|shared| {
                shared.feedback.model_status = "No model configured. Set HUB_MODEL_PATH to an IFC file.".into()
            });
            return;
        };

        let ctx = self.clone();
        std::thread::spawn(move || {
            let loaded = IfcModel::load(&path);
            let ui = ctx.ui.clone();
            let delivered = ui.upgrade_in_event_loop(move |_| {
                ctx.update(|shared| match loaded {
                    Ok(model) => {
                        let elements = model.elements();
                        shared.feedback.model_status = format!("{}: {} elements", path.display(), elements.len());
                        shared.feedback.elements = elements;
                        shared.dashboard.bim.set_model(model);
                    }
                    Err(e) => {
                        log::warn!("Failed to load {}: {e}", path.display());
                        shared.feedback.model_status = format!("Failed to load {}: {e}", path.display());
                    }
                })
            });
            if let Err(e) = delivered {
                log::warn!("Dropping loaded model, event loop is gone: {e}");
            }
        });
    }
}

/// Our App struct that holds the UI, the sensor API and the dashboard state.
/// A timer refreshes the sensor table while it is shown.
struct App {
    ui: AppWindow,
    context: Context,
    timer: slint::Timer,
}

impl App {
    fn new(config: Config) -> anyhow::Result<Self> {
        let ui = AppWindow::new()?;

        // Use the built-in demo data when running offline, the REST API otherwise.
        let api: SensorApiSharedPointer = if config.offline {
            log::info!("Running offline with demo data");
            Arc::new(DummySensorApi::new()?)
        } else {
            Arc::new(HttpSensorApi::new(config.api_base_url.clone())?)
        };

        let context = Context {
            ui: ui.as_weak(),
            api,
            shared: Arc::new(Mutex::new(Shared {
                dashboard: Dashboard::new(&config, Utc::now()),
                feedback: Feedback::default(),
            })),
            config: Arc::new(config),
        };

        Self::connect(&ui, &context);
        context.load_model();
        context.render();

        Ok(Self {
            ui,
            context,
            timer: slint::Timer::default(),
        })
    }

    /// Wire the view model callbacks to the context.
    fn connect(ui: &AppWindow, ctx: &Context) {
        let vm = ui.global::<ViewModel>();

        macro_rules! on {
            ($setter:ident, |$ctx:ident $(, $arg:ident)*| $body:expr) => {{
                let $ctx = ctx.clone();
                vm.$setter(move |$($arg),*| $body);
            }};
        }

        on!(on_navigate, |ctx, page| ctx.navigate(page.into()));
        on!(on_login, |ctx, username, password| ctx.login(username.into(), password.into()));
        on!(on_register, |ctx, username, password| ctx.register(username.into(), password.into()));
        on!(on_verify_username, |ctx, username| ctx.verify_username(username.into()));
        on!(on_reset_password, |ctx, new_password, confirm| ctx.reset_password(new_password.into(), confirm.into()));
        on!(on_logout, |ctx| ctx.logout());

        on!(on_refresh_sensors, |ctx| ctx.refresh_sensors());
        on!(on_next_page, |ctx| ctx.update(|shared| shared.dashboard.table.next_page()));
        on!(on_previous_page, |ctx| ctx.update(|shared| shared.dashboard.table.previous_page()));
        on!(on_change_rows_per_page, |ctx, rows| {
            if let Ok(rows) = rows.parse() {
                ctx.update(|shared| shared.dashboard.table.set_rows_per_page(rows));
            }
        });

        on!(on_select_sensor, |ctx, sensor| {
            ctx.lock().dashboard.analytics.select_sensor(Some(sensor.into()));
            ctx.fetch_analytics();
        });
        on!(on_select_metric, |ctx, label| {
            if let Some(filter) = MetricFilter::from_label(&label) {
                ctx.update(|shared| shared.dashboard.analytics.set_filter(filter));
            }
        });
        on!(on_select_date_range, |ctx, label| {
            if let Some(range) = DateRange::from_label(&label) {
                ctx.lock().dashboard.analytics.set_date_range(range);
                ctx.fetch_analytics();
            }
        });
        on!(on_apply_custom_range, |ctx, start, end| {
            let (start, end) = (parse_timestamp(&start), parse_timestamp(&end));
            ctx.lock().dashboard.analytics.set_custom_range(start, end);
            ctx.fetch_analytics();
        });
        on!(on_select_aggregation, |ctx, label| {
            if let Some(aggregation) = Aggregation::from_label(&label) {
                ctx.update(|shared| shared.dashboard.analytics.set_aggregation(aggregation));
            }
        });
        on!(on_select_chart_type, |ctx, label| {
            if let Some(chart_type) = ChartType::from_label(&label) {
                ctx.update(|shared| shared.dashboard.plugins.set_chart_type(chart_type));
            }
        });
        on!(on_export_csv, |ctx| ctx.export_csv());
        on!(on_export_image, |ctx| ctx.export_image());

        on!(on_select_element, |ctx, express_id| {
            if let Ok(express_id) = u32::try_from(express_id) {
                ctx.select_element(express_id);
            }
        });
        on!(on_toggle_pin, |ctx| ctx.update(|shared| shared.dashboard.bim.toggle_pin()));
        on!(on_close_properties, |ctx| ctx.update(|shared| shared.dashboard.bim.close()));
        on!(on_select_tab, |ctx, label| {
            if let Some(metric) = Metric::ALL.into_iter().find(|metric| metric.label() == label.as_str()) {
                ctx.update(|shared| shared.dashboard.bim.set_active_tab(metric));
            }
        });

        on!(on_toggle_plugin, |ctx, name| ctx.update(|shared| shared.dashboard.plugins.toggle(&name)));
        on!(on_toggle_alert, |ctx, index| {
            if let Some(&alert) = usize::try_from(index).ok().and_then(|index| Alert::ALL.get(index)) {
                ctx.update(|shared| shared.dashboard.settings.toggle_alert(alert));
            }
        });
        on!(on_toggle_channel, |ctx, index| {
            if let Some(&channel) = usize::try_from(index).ok().and_then(|index| NotifyChannel::ALL.get(index)) {
                ctx.update(|shared| shared.dashboard.settings.toggle_channel(channel));
            }
        });
        on!(on_dismiss_notification, |ctx| ctx.update(|shared| shared.feedback.notification.clear()));
    }

    /// Run the App and refresh the sensor table periodically while it is shown.
    fn run(&mut self) -> anyhow::Result<()> {
        let interval = self.context.config.refresh_interval_secs;
        if interval > 0 {
            let ctx = self.context.clone();
            self.timer.start(
                slint::TimerMode::Repeated,
                std::time::Duration::from_secs(interval),
                move || {
                    let page = ctx.lock().dashboard.shell.page();
                    if page == Page::Sensors {
                        ctx.refresh_sensors();
                    }
                },
            );
        }

        self.ui.run()?;

        // The model lives as long as the window does.
        self.context.lock().dashboard.bim.dispose();
        Ok(())
    }
}

/// A minimal main function that loads the configuration, then initializes the App and runs it.
fn main() -> anyhow::Result<()> {
    env_logger::init();

    let config = Config::load()?;
    let mut app = App::new(config)?;

    app.run()
}
