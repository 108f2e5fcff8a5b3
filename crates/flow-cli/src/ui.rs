use std::io;
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::{Backend, CrosstermBackend};
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{
    Block, Borders, Clear, Gauge, List, ListItem, ListState, Paragraph, Tabs, Wrap,
};
use ratatui::Terminal;

use flow_core::view::StudyView;
use flow_core::view::TaskBoardView;
use flow_core::ExtractedItem;
use flow_core::FlowAction;
use flow_core::Notice;
use flow_core::NoticeLevel;
use flow_core::Priority;
use flow_core::StudyAction;
use flow_core::StudyMode;
use flow_core::TaskAction;
use flow_core::TimerAction;
use flow_core::Workspace;

use crate::app::complete_top_task;
use crate::app::App;

const TICK: Duration = Duration::from_secs(1);

struct TuiGuard;

impl Drop for TuiGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen, crossterm::cursor::Show);
    }
}

pub fn run(mut app: App) -> Result<(), Box<dyn std::error::Error>> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, crossterm::cursor::Hide)?;
    let _guard = TuiGuard;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_app(&mut terminal, &mut app);
    app.flush();
    result
}

enum UiEvent {
    ExtractionFinished(Result<Vec<ExtractedItem>, String>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tab {
    Tasks,
    Study,
}

impl Tab {
    fn index(self) -> usize {
        match self {
            Self::Tasks => 0,
            Self::Study => 1,
        }
    }

    fn other(self) -> Self {
        match self {
            Self::Tasks => Self::Study,
            Self::Study => Self::Tasks,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InputKind {
    NewTask(Priority),
    Extract,
    NewSubject,
}

impl InputKind {
    fn title(self) -> &'static str {
        match self {
            Self::NewTask(_) => "New task (Tab cycles priority)",
            Self::Extract => "Describe your day; tasks are extracted from it",
            Self::NewSubject => "New subject",
        }
    }
}

/// Cursor and prompt state that lives only as long as the dashboard.
#[derive(Debug, Clone)]
struct UiState {
    tab: Tab,
    task_cursor: usize,
    subject_cursor: usize,
    input: Option<InputKind>,
    buffer: String,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            tab: Tab::Tasks,
            task_cursor: 0,
            subject_cursor: 0,
            input: None,
            buffer: String::new(),
        }
    }
}

impl UiState {
    fn clamp(&mut self, ws: &Workspace) {
        self.task_cursor = self.task_cursor.min(ws.tasks.tasks.len().saturating_sub(1));
        self.subject_cursor = self
            .subject_cursor
            .min(ws.study.subjects.len().saturating_sub(1));
    }
}

#[derive(Clone, Copy)]
struct UiPalette {
    accent: Color,
    accent_alt: Color,
    success: Color,
    warning: Color,
    danger: Color,
    muted: Color,
    border: Color,
    selected_bg: Color,
}

const PALETTE: UiPalette = UiPalette {
    accent: Color::Cyan,
    accent_alt: Color::Blue,
    success: Color::Green,
    warning: Color::Yellow,
    danger: Color::Red,
    muted: Color::DarkGray,
    border: Color::Gray,
    selected_bg: Color::DarkGray,
};

enum KeyHandlerResult {
    Continue(Vec<FlowAction>),
    Exit,
}

fn next_priority(priority: Priority) -> Priority {
    match priority {
        Priority::Medium => Priority::High,
        Priority::High => Priority::Low,
        Priority::Low => Priority::Medium,
    }
}

fn next_mode(mode: StudyMode) -> StudyMode {
    match mode {
        StudyMode::Normal => StudyMode::Hardcore,
        StudyMode::Hardcore => StudyMode::Chill,
        StudyMode::Chill => StudyMode::Recovery,
        StudyMode::Recovery => StudyMode::Normal,
    }
}

fn handle_input_keys(key: KeyEvent, kind: InputKind, ui: &mut UiState) -> KeyHandlerResult {
    let mut actions = Vec::new();
    match key.code {
        KeyCode::Esc => {
            ui.input = None;
            ui.buffer.clear();
        }
        KeyCode::Tab => {
            if let InputKind::NewTask(priority) = kind {
                ui.input = Some(InputKind::NewTask(next_priority(priority)));
            }
        }
        KeyCode::Backspace => {
            ui.buffer.pop();
        }
        KeyCode::Enter => {
            let text = std::mem::take(&mut ui.buffer);
            ui.input = None;
            actions.push(match kind {
                InputKind::NewTask(priority) => FlowAction::Tasks(TaskAction::Add {
                    title: text,
                    priority,
                }),
                InputKind::Extract => FlowAction::Tasks(TaskAction::RequestExtraction { text }),
                InputKind::NewSubject => FlowAction::Study(StudyAction::AddSubject {
                    name: text,
                    link: None,
                }),
            });
        }
        KeyCode::Char(c) => ui.buffer.push(c),
        _ => {}
    }
    KeyHandlerResult::Continue(actions)
}

fn handle_task_keys(key: KeyEvent, ws: &Workspace, ui: &mut UiState) -> Vec<FlowAction> {
    let selected = ws.tasks.tasks.get(ui.task_cursor).map(|task| task.id.clone());
    match key.code {
        KeyCode::Up | KeyCode::Char('k') => {
            ui.task_cursor = ui.task_cursor.saturating_sub(1);
            Vec::new()
        }
        KeyCode::Down | KeyCode::Char('j') => {
            ui.task_cursor = ui.task_cursor.saturating_add(1);
            Vec::new()
        }
        KeyCode::Char('a') => {
            ui.input = Some(InputKind::NewTask(Priority::Medium));
            Vec::new()
        }
        KeyCode::Char('e') => {
            ui.input = Some(InputKind::Extract);
            Vec::new()
        }
        KeyCode::Char(' ') | KeyCode::Enter => selected
            .map(|id| vec![FlowAction::Tasks(TaskAction::Toggle(id))])
            .unwrap_or_default(),
        KeyCode::Char('d') => selected
            .map(|id| vec![FlowAction::Tasks(TaskAction::Delete(id))])
            .unwrap_or_default(),
        KeyCode::Char('p') => selected
            .map(|id| vec![FlowAction::Tasks(TaskAction::Publish(id))])
            .unwrap_or_default(),
        KeyCode::Char('c') => complete_top_task(ws)
            .map(|action| vec![FlowAction::Tasks(action)])
            .unwrap_or_default(),
        KeyCode::Char('g') => {
            let top = ws.tasks.top_task().map(|task| &task.id);
            if let Some(idx) = ws.tasks.tasks.iter().position(|task| Some(&task.id) == top) {
                ui.task_cursor = idx;
            }
            Vec::new()
        }
        KeyCode::Char('t') => vec![FlowAction::Tasks(TaskAction::Timer(TimerAction::Toggle))],
        KeyCode::Char('r') => vec![FlowAction::Tasks(TaskAction::Timer(TimerAction::Reset))],
        _ => Vec::new(),
    }
}

fn handle_study_keys(key: KeyEvent, ws: &Workspace, ui: &mut UiState) -> Vec<FlowAction> {
    let extras = &ws.study.extras;
    match key.code {
        KeyCode::Up | KeyCode::Char('k') => {
            ui.subject_cursor = ui.subject_cursor.saturating_sub(1);
            Vec::new()
        }
        KeyCode::Down | KeyCode::Char('j') => {
            ui.subject_cursor = ui.subject_cursor.saturating_add(1);
            Vec::new()
        }
        KeyCode::Char('u') | KeyCode::Enter => ws
            .study
            .subjects
            .get(ui.subject_cursor)
            .map(|subject| {
                vec![FlowAction::Study(StudyAction::UpgradeSubject {
                    id: subject.id.clone(),
                })]
            })
            .unwrap_or_default(),
        KeyCode::Char('n') => {
            ui.input = Some(InputKind::NewSubject);
            Vec::new()
        }
        KeyCode::Char('t') => vec![FlowAction::Study(StudyAction::Timer(TimerAction::Toggle))],
        KeyCode::Char('r') => vec![FlowAction::Study(StudyAction::Timer(TimerAction::Reset))],
        KeyCode::Char('m') => vec![FlowAction::Study(StudyAction::SetMode(next_mode(
            extras.mode,
        )))],
        KeyCode::Char('R') => vec![FlowAction::Study(StudyAction::RerollChallenges {
            seed: rand::random(),
        })],
        KeyCode::Char('P') => vec![FlowAction::Study(StudyAction::SetPenalty(
            !extras.penalty_active,
        ))],
        KeyCode::Char('I') => vec![FlowAction::Study(StudyAction::SetStreakInsurance(
            !extras.streak_insurance,
        ))],
        _ => Vec::new(),
    }
}

fn handle_key_event(key: KeyEvent, ws: &Workspace, ui: &mut UiState) -> KeyHandlerResult {
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        return KeyHandlerResult::Exit;
    }
    if let Some(kind) = ui.input {
        return handle_input_keys(key, kind, ui);
    }

    let actions = match key.code {
        KeyCode::Char('q') | KeyCode::Esc => return KeyHandlerResult::Exit,
        KeyCode::Tab | KeyCode::BackTab => {
            ui.tab = ui.tab.other();
            Vec::new()
        }
        KeyCode::Char('1') => {
            ui.tab = Tab::Tasks;
            Vec::new()
        }
        KeyCode::Char('2') => {
            ui.tab = Tab::Study;
            Vec::new()
        }
        _ => match ui.tab {
            Tab::Tasks => handle_task_keys(key, ws, ui),
            Tab::Study => handle_study_keys(key, ws, ui),
        },
    };
    ui.clamp(ws);
    KeyHandlerResult::Continue(actions)
}

fn run_app<B: Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
) -> Result<(), Box<dyn std::error::Error>> {
    let (tx, rx) = mpsc::channel();
    let mut ui = UiState::default();
    let mut last_tick = Instant::now();

    loop {
        // Extraction answers from the worker thread.
        while let Ok(event) = rx.try_recv() {
            match event {
                UiEvent::ExtractionFinished(result) => {
                    app.dispatch(FlowAction::Tasks(TaskAction::ExtractionFinished(result)));
                }
            }
        }

        if last_tick.elapsed() >= TICK {
            last_tick = Instant::now();
            for action in [
                FlowAction::Tasks(TaskAction::Timer(TimerAction::Tick)),
                FlowAction::Study(StudyAction::Timer(TimerAction::Tick)),
            ] {
                app.dispatch(action);
            }
        }

        ui.clamp(app.workspace());
        terminal.draw(|f| draw(f, app.workspace(), &ui))?;

        let wait = TICK.saturating_sub(last_tick.elapsed()).min(Duration::from_millis(250));
        if !event::poll(wait)? {
            continue;
        }
        let Event::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }

        let actions = match handle_key_event(key, app.workspace(), &mut ui) {
            KeyHandlerResult::Exit => return Ok(()),
            KeyHandlerResult::Continue(actions) => actions,
        };
        for action in actions {
            let outcome = app.dispatch(action);
            if let Some(text) = outcome.extraction {
                let extractor = app.extractor();
                let tx_clone = tx.clone();
                thread::spawn(move || {
                    let result = extractor.extract(&text).map_err(|err| {
                        tracing::warn!(error = %err, "extraction failed");
                        err.to_string()
                    });
                    let _ = tx_clone.send(UiEvent::ExtractionFinished(result));
                });
            }
        }
    }
}

fn draw(f: &mut ratatui::Frame, ws: &Workspace, ui: &UiState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Tabs
            Constraint::Min(0),    // Content
            Constraint::Length(3), // Notice
            Constraint::Length(2), // Action bar
        ])
        .split(f.area());

    let tabs = Tabs::new(vec!["1 Tasks", "2 Study"])
        .select(ui.tab.index())
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(PALETTE.border))
                .title("Flow"),
        )
        .highlight_style(
            Style::default()
                .fg(PALETTE.accent)
                .add_modifier(Modifier::BOLD),
        );
    f.render_widget(tabs, chunks[0]);

    let latest = match ui.tab {
        Tab::Tasks => {
            let view = ws.task_board_view();
            render_tasks(f, chunks[1], &view, ui);
            view.latest_notice
        }
        Tab::Study => {
            let view = ws.study_view();
            render_study(f, chunks[1], &view, ui);
            view.latest_notice
        }
    };
    render_notice(f, chunks[2], latest.as_ref());
    render_action_bar(f, chunks[3], ui.tab);

    if let Some(kind) = ui.input {
        render_input(f, kind, &ui.buffer);
    }
}

fn panel(title: &str) -> Block<'_> {
    Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(PALETTE.border))
        .title(title)
}

fn priority_style(priority: &str) -> Style {
    match priority {
        "high" => Style::default().fg(PALETTE.danger),
        "medium" => Style::default().fg(PALETTE.warning),
        _ => Style::default().fg(PALETTE.muted),
    }
}

fn render_tasks(f: &mut ratatui::Frame, area: Rect, view: &TaskBoardView, ui: &UiState) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(65), Constraint::Percentage(35)])
        .split(area);

    let items: Vec<ListItem> = view
        .rows
        .iter()
        .map(|row| {
            let check = if row.completed { "[x] " } else { "[ ] " };
            let mut spans = vec![
                Span::raw(check),
                Span::styled(format!("{:<6} ", row.priority), priority_style(row.priority)),
                Span::raw(row.title.clone()),
            ];
            if let Some(points) = row.points.filter(|_| row.published) {
                spans.push(Span::styled(
                    format!("  +{points}"),
                    Style::default().fg(PALETTE.success),
                ));
            } else if row.can_publish {
                spans.push(Span::styled(
                    "  p: publish",
                    Style::default().fg(PALETTE.accent_alt),
                ));
            }
            ListItem::new(Line::from(spans))
        })
        .collect();

    let title = if view.extracting {
        format!("Tasks ({} pts) · analysing…", view.total_points)
    } else {
        format!("Tasks ({} pts)", view.total_points)
    };
    let list = List::new(items)
        .block(panel(&title))
        .highlight_style(Style::default().bg(PALETTE.selected_bg))
        .highlight_symbol("> ");
    let mut state = ListState::default();
    if !view.rows.is_empty() {
        state.select(Some(ui.task_cursor));
    }
    f.render_stateful_widget(list, chunks[0], &mut state);

    let clock_style = if view.focus.running {
        Style::default().fg(PALETTE.success).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(PALETTE.accent)
    };
    let focus_text = vec![
        Line::from(Span::styled("Up next", Style::default().fg(PALETTE.muted))),
        Line::from(
            view.focus
                .top_task
                .clone()
                .unwrap_or_else(|| "Nothing open".to_string()),
        ),
        Line::from(""),
        Line::from(Span::styled(view.focus.clock.clone(), clock_style)),
        Line::from(Span::styled(
            if view.focus.running { "running" } else { "paused" },
            Style::default().fg(PALETTE.muted),
        )),
    ];
    let focus = Paragraph::new(focus_text)
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .block(panel("Focus"));
    f.render_widget(focus, chunks[1]);
}

fn render_study(f: &mut ratatui::Frame, area: Rect, view: &StudyView, ui: &UiState) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Length(7), Constraint::Min(0)])
        .split(area);

    let gauge_title = format!("Lv {} · {}", view.level, view.title);
    let gauge = Gauge::default()
        .block(panel(&gauge_title))
        .gauge_style(Style::default().fg(PALETTE.accent))
        .percent(u16::from(view.level_progress))
        .label(format!("{}/{} xp", view.xp, view.threshold));
    f.render_widget(gauge, rows[0]);

    let top = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(rows[1]);

    let label = |text: &'static str| Span::styled(text, Style::default().fg(PALETTE.accent));
    let stats = vec![
        Line::from(vec![
            label("Lifetime "),
            Span::raw(format!("{}  ", view.lifetime_xp)),
            label("Today "),
            Span::raw(format!("{}  ", view.daily_xp)),
            label("Week "),
            Span::raw(view.weekly_xp.to_string()),
        ]),
        Line::from(vec![
            label("Streak "),
            Span::raw(format!("{} (best {})  ", view.streak, view.best_streak)),
            label("Energy "),
            Span::raw(view.energy.to_string()),
        ]),
        Line::from(vec![
            label("Coins "),
            Span::raw(format!("{}  ", view.coins)),
            label("Gems "),
            Span::raw(view.gems.to_string()),
        ]),
        Line::from(vec![
            label("Mode "),
            Span::raw(format!("{}  ", view.mode)),
            label("Penalty "),
            Span::raw(format!("{}  ", if view.penalty_active { "on" } else { "off" })),
            label("Insurance "),
            Span::raw(if view.streak_insurance { "on" } else { "off" }),
        ]),
        Line::from(vec![
            label("Timer "),
            Span::styled(
                view.clock.clone(),
                if view.running {
                    Style::default().fg(PALETTE.success).add_modifier(Modifier::BOLD)
                } else {
                    Style::default()
                },
            ),
            Span::raw(format!(
                "  {} sessions, {}m",
                view.sessions, view.focus_minutes
            )),
        ]),
    ];
    f.render_widget(Paragraph::new(stats).block(panel(&view.display_name)), top[0]);

    let mut challenges = Vec::new();
    for (kind, challenge) in [
        ("Daily", &view.daily_challenge),
        ("Weekly", &view.weekly_challenge),
    ] {
        if let Some(challenge) = challenge {
            challenges.push(Line::from(vec![
                Span::styled(format!("{kind}: "), Style::default().fg(PALETTE.accent)),
                Span::raw(format!("{} (+{} xp)", challenge.description, challenge.reward_xp)),
            ]));
        }
    }
    if let Some(hour) = view.peak_hour {
        challenges.push(Line::from(Span::styled(
            format!("Peak hour {hour:02}:00"),
            Style::default().fg(PALETTE.muted),
        )));
    }
    if !view.achievements.is_empty() {
        challenges.push(Line::from(Span::styled(
            view.achievements.join(" · "),
            Style::default().fg(PALETTE.success),
        )));
    }
    f.render_widget(
        Paragraph::new(challenges)
            .wrap(Wrap { trim: true })
            .block(panel("Challenges")),
        top[1],
    );

    let bottom = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(rows[2]);

    let subjects: Vec<ListItem> = view
        .subjects
        .iter()
        .map(|subject| {
            let style = if subject.complete {
                Style::default().fg(PALETTE.success)
            } else {
                Style::default()
            };
            ListItem::new(Line::from(vec![
                Span::styled(format!("{:<18}", subject.name), style),
                Span::styled(format!("{:>3}%", subject.progress), style),
            ]))
        })
        .collect();
    let list = List::new(subjects)
        .block(panel("Subjects"))
        .highlight_style(Style::default().bg(PALETTE.selected_bg))
        .highlight_symbol("> ");
    let mut state = ListState::default();
    if !view.subjects.is_empty() {
        state.select(Some(ui.subject_cursor));
    }
    f.render_stateful_widget(list, bottom[0], &mut state);

    let standings: Vec<Line> = view
        .leaderboard
        .iter()
        .map(|row| {
            let style = if row.is_user {
                Style::default().fg(PALETTE.accent).add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            Line::from(Span::styled(
                format!("{:>2}. {:<14} {:>6}", row.rank, row.name, row.xp),
                style,
            ))
        })
        .collect();
    f.render_widget(
        Paragraph::new(standings).block(panel(&format!("Leaderboard · #{}", view.rank))),
        bottom[1],
    );
}

fn render_notice(f: &mut ratatui::Frame, area: Rect, notice: Option<&Notice>) {
    let line = match notice {
        Some(notice) => {
            let color = match notice.level {
                NoticeLevel::Info => PALETTE.accent,
                NoticeLevel::Success => PALETTE.success,
                NoticeLevel::Error => PALETTE.danger,
            };
            Line::from(vec![
                Span::styled(
                    format!("[{}] ", notice.level.label()),
                    Style::default().fg(color),
                ),
                Span::raw(notice.message.clone()),
            ])
        }
        None => Line::from(Span::styled("Ready", Style::default().fg(PALETTE.muted))),
    };
    f.render_widget(Paragraph::new(line).block(panel("Notice")), area);
}

fn render_action_bar(f: &mut ratatui::Frame, area: Rect, tab: Tab) {
    let keys: &[(&str, &str)] = match tab {
        Tab::Tasks => &[
            ("a", "add"),
            ("e", "extract"),
            ("space", "done"),
            ("c", "done top"),
            ("g", "go to top"),
            ("p", "publish"),
            ("d", "delete"),
            ("t", "timer"),
            ("r", "reset"),
        ],
        Tab::Study => &[
            ("u", "upgrade"),
            ("n", "subject"),
            ("t", "timer"),
            ("r", "reset"),
            ("m", "mode"),
            ("R", "reroll"),
            ("P/I", "flags"),
        ],
    };
    let mut spans = Vec::new();
    for (key, label) in keys.iter().chain([("tab", "switch"), ("q", "quit")].iter()) {
        let key_style = if *key == "q" {
            Style::default().fg(PALETTE.warning)
        } else {
            Style::default().fg(PALETTE.accent)
        };
        spans.push(Span::styled(*key, key_style));
        spans.push(Span::styled(format!(" {label}  "), Style::default().fg(PALETTE.muted)));
    }
    f.render_widget(
        Paragraph::new(Line::from(spans)).alignment(Alignment::Center),
        area,
    );
}

fn render_input(f: &mut ratatui::Frame, kind: InputKind, buffer: &str) {
    let area = centered_rect(60, 20, f.area());
    let title = match kind {
        InputKind::NewTask(priority) => format!("{} · {}", kind.title(), priority.label()),
        _ => kind.title().to_string(),
    };
    f.render_widget(Clear, area);
    f.render_widget(
        Paragraph::new(format!("{buffer}_"))
            .wrap(Wrap { trim: false })
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(PALETTE.accent))
                    .title(title),
            ),
        area,
    );
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
