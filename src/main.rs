use clap::Parser;
use iced::keyboard::{self, key::Named, Key};
use iced::widget::image::Handle;
use iced::widget::{button, column, container, horizontal_space, row, scrollable, text, text_input, Column};
use iced::{Alignment, Element, Length, Subscription, Task, Theme};
use rfd::FileDialog;
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod error;
mod preview;
mod settings;
mod state;

use preview::thumbnail::{load_preview, PreviewImage};
use settings::{csv_for_images_dir, ProjectPaths, Settings, DEFAULT_CSV_NAME};
use state::data::LabelOutcome;
use state::session::{OpenedSession, Session};

/// Command-line options; every path can also come from the environment
#[derive(Parser, Debug)]
#[command(name = "image-labeller", version, about = "Assign one label to each image in a folder")]
struct Args {
    /// Folder containing the images (searched recursively)
    #[arg(long, env = "LABELLER_IMAGES")]
    images: Option<PathBuf>,

    /// Text file with one label per line
    #[arg(long, env = "LABELLER_LABELS")]
    labels: Option<PathBuf>,

    /// CSV file for annotations (default: <images>/labels.csv)
    #[arg(long, env = "LABELLER_CSV")]
    csv: Option<PathBuf>,

    /// Load the project immediately instead of waiting for "Load project"
    #[arg(long)]
    open: bool,
}

/// What the viewer currently shows
enum PreviewState {
    Empty,
    Loading,
    Ready(Handle),
    Failed(String),
}

/// Main application state
struct Labeller {
    images_input: String,
    labels_input: String,
    csv_input: String,
    /// The open project, if any
    session: Option<Session>,
    preview: PreviewState,
    /// Status message to display to the user
    status: String,
}

/// Application messages (events)
#[derive(Debug, Clone)]
enum Message {
    ImagesChanged(String),
    LabelsChanged(String),
    CsvChanged(String),
    BrowseImages,
    BrowseLabels,
    BrowseCsv,
    LoadProject,
    /// A label button was pressed
    Label(String),
    /// Number key 1-9, zero-based
    LabelHotkey(usize),
    Next,
    Previous,
    Save,
    /// Background decode finished for the given path
    PreviewLoaded(String, Result<PreviewImage, String>),
}

impl Labeller {
    /// Create a new instance of the application
    fn new(args: Args) -> (Self, Task<Message>) {
        let remembered = Settings::load().last_project.unwrap_or_default();

        // A saved CSV path belongs to the saved folder; don't mix it with a new one
        let csv = match (&args.csv, &args.images) {
            (Some(csv), _) => csv.display().to_string(),
            (None, Some(_)) => String::new(),
            (None, None) => remembered
                .csv_path
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_default(),
        };

        let mut app = Labeller {
            images_input: args
                .images
                .unwrap_or(remembered.images_dir)
                .display()
                .to_string(),
            labels_input: args
                .labels
                .unwrap_or(remembered.labels_file)
                .display()
                .to_string(),
            csv_input: csv,
            session: None,
            preview: PreviewState::Empty,
            status: "Pick a folder to get started".to_string(),
        };

        let task = if args.open {
            app.load_project()
        } else {
            Task::none()
        };

        (app, task)
    }

    /// Handle application messages and update state
    fn update(&mut self, message: Message) -> Task<Message> {
        match message {
            Message::ImagesChanged(value) => {
                self.set_images_input(value);
                Task::none()
            }
            Message::LabelsChanged(value) => {
                self.labels_input = value;
                Task::none()
            }
            Message::CsvChanged(value) => {
                self.csv_input = value;
                Task::none()
            }
            Message::BrowseImages => {
                let folder = FileDialog::new()
                    .set_title("Select images folder")
                    .pick_folder();

                if let Some(folder) = folder {
                    self.set_images_input(folder.display().to_string());
                }
                Task::none()
            }
            Message::BrowseLabels => {
                let file = FileDialog::new()
                    .set_title("Select labels text file")
                    .add_filter("Text files", &["txt"])
                    .add_filter("All files", &["*"])
                    .pick_file();

                if let Some(file) = file {
                    self.labels_input = file.display().to_string();
                }
                Task::none()
            }
            Message::BrowseCsv => {
                let file = FileDialog::new()
                    .set_title("Save CSV as")
                    .add_filter("CSV files", &["csv"])
                    .set_file_name(DEFAULT_CSV_NAME)
                    .save_file();

                if let Some(file) = file {
                    self.csv_input = file.display().to_string();
                }
                Task::none()
            }
            Message::LoadProject => self.load_project(),
            Message::Label(name) => {
                let Some(session) = self.session.as_mut() else {
                    return Task::none();
                };

                match session.label_current(&name) {
                    Ok(LabelOutcome::Ignored) => Task::none(),
                    Ok(_) => {
                        self.status = session.progress_text();
                        self.request_preview()
                    }
                    Err(e) => {
                        // The label is kept in memory; saving again retries the write
                        self.status = format!("⚠️  {}. Press Save to retry.", e);
                        self.request_preview()
                    }
                }
            }
            Message::LabelHotkey(index) => {
                let name = self
                    .session
                    .as_ref()
                    .and_then(|s| s.labels().get(index))
                    .map(|label| label.name.clone());

                match name {
                    Some(name) => self.update(Message::Label(name)),
                    None => Task::none(),
                }
            }
            Message::Next => {
                if let Some(session) = self.session.as_mut() {
                    session.advance();
                }
                self.request_preview()
            }
            Message::Previous => {
                if let Some(session) = self.session.as_mut() {
                    session.retreat();
                }
                self.request_preview()
            }
            Message::Save => {
                if let Some(session) = &self.session {
                    self.status = match session.save() {
                        Ok(()) => format!("✅ Saved to {}", session.csv_path().display()),
                        Err(e) => format!("⚠️  {}", e),
                    };
                }
                Task::none()
            }
            Message::PreviewLoaded(path, result) => {
                let current = self.session.as_ref().and_then(|s| s.current_path());
                if current != Some(path.as_str()) {
                    // The user moved on before decoding finished
                    return Task::none();
                }

                self.preview = match result {
                    Ok(preview) => PreviewState::Ready(Handle::from_rgba(
                        preview.width,
                        preview.height,
                        preview.pixels,
                    )),
                    Err(e) => PreviewState::Failed(e),
                };
                Task::none()
            }
        }
    }

    /// Change the images folder; a default CSV path moves along with it
    fn set_images_input(&mut self, value: String) {
        self.csv_input = csv_for_images_dir(&self.csv_input, &self.images_input, &value);
        self.images_input = value;
    }

    /// Open the project described by the input fields, replacing any open one
    fn load_project(&mut self) -> Task<Message> {
        let paths = ProjectPaths::from_inputs(&self.images_input, &self.labels_input, &self.csv_input);

        match Session::open(&paths) {
            Ok(OpenedSession {
                session,
                load_warning,
            }) => {
                self.csv_input = session.csv_path().display().to_string();
                self.status = match load_warning {
                    Some(e) => format!("⚠️  {}. Starting with no labels.", e),
                    None => session.progress_text(),
                };
                Settings::remember(&paths);
                self.session = Some(session);
                self.request_preview()
            }
            Err(e) => {
                warn!("Could not open project: {}", e);
                let marker = if e.is_fatal() { "❌" } else { "⚠️ " };
                self.status = format!("{} {}", marker, e);
                Task::none()
            }
        }
    }

    /// Start decoding the image under the cursor
    fn request_preview(&mut self) -> Task<Message> {
        let path = self
            .session
            .as_ref()
            .and_then(|s| s.current_path())
            .map(str::to_string);

        match path {
            Some(path) => {
                self.preview = PreviewState::Loading;
                Task::perform(load_preview(path.clone()), move |result| {
                    Message::PreviewLoaded(path.clone(), result)
                })
            }
            None => {
                self.preview = PreviewState::Empty;
                Task::none()
            }
        }
    }

    /// Build the user interface
    fn view(&self) -> Element<Message> {
        let fields = column![
            path_row("Images folder", &self.images_input, Message::ImagesChanged, Message::BrowseImages, "Browse"),
            path_row("Labels file", &self.labels_input, Message::LabelsChanged, Message::BrowseLabels, "Browse"),
            path_row("CSV output", &self.csv_input, Message::CsvChanged, Message::BrowseCsv, "Set"),
        ]
        .spacing(8)
        .width(Length::Fill);

        let top = row![
            fields,
            button("Load project")
                .on_press(Message::LoadProject)
                .style(button::success)
                .padding(12),
        ]
        .spacing(16)
        .align_y(Alignment::Center);

        let body: Element<Message> = match &self.session {
            Some(session) => self.session_view(session),
            None => container(text("Pick a folder, a labels file and load the project").size(18))
                .width(Length::Fill)
                .height(Length::Fill)
                .center_x(Length::Fill)
                .center_y(Length::Fill)
                .into(),
        };

        column![
            text("Image Labeller").size(28),
            top,
            body,
            text(self.status.as_str()).size(14),
        ]
        .spacing(16)
        .padding(20)
        .into()
    }

    fn session_view<'a>(&'a self, session: &'a Session) -> Element<'a, Message> {
        let current = session.current_path();
        let current_label = current.and_then(|path| session.label_of(path));

        let viewer: Element<Message> = match &self.preview {
            PreviewState::Ready(handle) => iced::widget::image(handle.clone())
                .width(Length::Fill)
                .height(Length::Fill)
                .into(),
            PreviewState::Loading => text("Loading...").into(),
            PreviewState::Failed(e) => text(format!("Could not load image:\n{}", e))
                .style(text::danger)
                .into(),
            PreviewState::Empty => text("No images loaded").into(),
        };

        let label_line = match current.and_then(|path| session.assignment_of(path)) {
            Some(assignment) => format!("Label: {} ({})", assignment.label, assignment.timestamp),
            None => "Label: Unlabeled".to_string(),
        };

        let viewer_panel = column![
            text(session.caption()).size(16),
            container(viewer)
                .width(Length::Fill)
                .height(Length::Fill)
                .center_x(Length::Fill)
                .center_y(Length::Fill),
            row![
                text(session.progress_text()),
                horizontal_space(),
                text(label_line),
            ],
        ]
        .spacing(10)
        .width(Length::FillPortion(3));

        let label_buttons = session
            .labels()
            .iter()
            .fold(Column::new().spacing(6), |col, label| {
                let caption = if label.index < 9 {
                    format!("{}  {}", label.index + 1, label.name)
                } else {
                    label.name.clone()
                };
                let style = if current_label == Some(label.name.as_str()) {
                    button::primary
                } else {
                    button::secondary
                };

                col.push(
                    button(text(caption))
                        .width(Length::Fill)
                        .padding(10)
                        .style(style)
                        .on_press(Message::Label(label.name.clone())),
                )
            });

        let counts = session
            .labels()
            .iter()
            .fold(Column::new().spacing(4), |col, label| {
                col.push(row![
                    text(label.name.as_str()),
                    horizontal_space(),
                    text(session.count_for(&label.name).to_string()),
                ])
            });

        let nav = row![
            button("◀ Previous").on_press(Message::Previous).width(Length::Fill),
            button("Next ▶").on_press(Message::Next).width(Length::Fill),
        ]
        .spacing(8);

        let side_panel = column![
            text("Labels").size(20),
            scrollable(label_buttons).height(Length::FillPortion(2)),
            text("Counts").size(20),
            scrollable(counts).height(Length::FillPortion(1)),
            nav,
            button("Save").on_press(Message::Save).width(Length::Fill),
        ]
        .spacing(10)
        .width(Length::Fixed(280.0));

        row![viewer_panel, side_panel]
            .spacing(12)
            .height(Length::Fill)
            .into()
    }

    /// Arrow keys navigate, number keys pick a label
    fn subscription(&self) -> Subscription<Message> {
        keyboard::on_key_press(hotkey)
    }

    /// Set the application theme
    fn theme(&self) -> Theme {
        Theme::Dark
    }
}

fn hotkey(key: Key, _modifiers: keyboard::Modifiers) -> Option<Message> {
    match key.as_ref() {
        Key::Named(Named::ArrowLeft) => Some(Message::Previous),
        Key::Named(Named::ArrowRight) => Some(Message::Next),
        Key::Character(c) => c
            .parse::<usize>()
            .ok()
            .filter(|n| (1..=9).contains(n))
            .map(|n| Message::LabelHotkey(n - 1)),
        _ => None,
    }
}

/// One "name: [path] [button]" line of the project form
fn path_row<'a>(
    name: &'static str,
    value: &'a str,
    on_input: fn(String) -> Message,
    on_browse: Message,
    browse: &'static str,
) -> Element<'a, Message> {
    row![
        text(name).width(Length::Fixed(110.0)),
        text_input("", value)
            .on_input(on_input)
            .padding(6)
            .width(Length::Fill),
        button(browse).on_press(on_browse),
    ]
    .spacing(8)
    .align_y(Alignment::Center)
    .into()
}

fn main() -> iced::Result {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    info!("🎨 Starting Image Labeller v{}", env!("CARGO_PKG_VERSION"));

    iced::application("Image Labeller", Labeller::update, Labeller::view)
        .theme(Labeller::theme)
        .subscription(Labeller::subscription)
        .window_size((1300.0, 900.0))
        .centered()
        .run_with(move || Labeller::new(args))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hotkeys() {
        assert!(matches!(
            hotkey(Key::Named(Named::ArrowLeft), keyboard::Modifiers::empty()),
            Some(Message::Previous)
        ));
        assert!(matches!(
            hotkey(Key::Character("3".into()), keyboard::Modifiers::empty()),
            Some(Message::LabelHotkey(2))
        ));
        assert!(hotkey(Key::Character("0".into()), keyboard::Modifiers::empty()).is_none());
        assert!(hotkey(Key::Character("x".into()), keyboard::Modifiers::empty()).is_none());
    }

    #[test]
    fn test_cli_paths() {
        let args = Args::try_parse_from([
            "image-labeller",
            "--images",
            "/data/pics",
            "--labels",
            "/data/labels.txt",
            "--open",
        ])
        .unwrap();
        assert_eq!(args.images, Some(PathBuf::from("/data/pics")));
        assert!(args.open);
    }

    fn labeller(images: &str, csv: &str) -> Labeller {
        Labeller {
            images_input: images.to_string(),
            labels_input: "/data/labels.txt".to_string(),
            csv_input: csv.to_string(),
            session: None,
            preview: PreviewState::Empty,
            status: String::new(),
        }
    }

    #[test]
    fn test_switching_folder_moves_default_csv() {
        // Fields as left by opening /data/a with no CSV given
        let mut app = labeller("/data/a", "/data/a/labels.csv");
        let _ = app.update(Message::ImagesChanged("/data/b".to_string()));

        assert_eq!(app.images_input, "/data/b");
        assert_eq!(app.csv_input, "/data/b/labels.csv");
        let paths = ProjectPaths::from_inputs(&app.images_input, &app.labels_input, &app.csv_input);
        assert_eq!(paths.resolved_csv_path(), PathBuf::from("/data/b/labels.csv"));
    }

    #[test]
    fn test_switching_folder_keeps_chosen_csv() {
        let mut app = labeller("/data/a", "/out/all.csv");
        let _ = app.update(Message::ImagesChanged("/data/b".to_string()));
        assert_eq!(app.csv_input, "/out/all.csv");
    }
}
