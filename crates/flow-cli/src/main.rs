mod app;
mod ui;

use std::env;
use std::fs::OpenOptions;
use std::io;
use std::io::IsTerminal;
use std::io::Read;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use flow_core::view::StudyView;
use flow_core::view::TaskBoardView;
use flow_core::Config;
use flow_core::FlowAction;
use flow_core::Notice;
use flow_core::NoticeLevel;
use flow_core::Priority;
use flow_core::StateStore;
use flow_core::StudyAction;
use flow_core::StudyMode;
use flow_core::TaskAction;
use flow_core::TaskId;
use flow_core::TimerAction;
use flow_exec::CliTaskExtractor;
use flow_exec::ExtractionRequest;
use tracing_subscriber::EnvFilter;

use crate::app::complete_top_task;
use crate::app::App;

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

const LOG_ENV: &str = "FLOW_LOG";

fn main() {
    if let Err(err) = run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn run() -> CliResult<()> {
    let (data_dir_flag, mut args) = split_global_args(env::args().skip(1).collect())?;
    if args.is_empty() {
        print_help();
        return Ok(());
    }
    let command = args.remove(0);

    match command.as_str() {
        "--help" | "-h" | "help" => {
            print_help();
            Ok(())
        }
        "--version" | "-V" | "version" => {
            println!("flow {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        "tasks" | "study" | "timer" | "ui" => {
            let config = Config::load(&config_path())?;
            let data_dir = resolve_data_dir(data_dir_flag, &config);
            let store = StateStore::open(&data_dir)?;
            if command == "ui" {
                init_logging(LogTarget::File(data_dir.join("flow.log")))?;
            } else {
                init_logging(LogTarget::Stderr)?;
            }
            tracing::debug!(data_dir = %data_dir.display(), "starting");

            let extractor = CliTaskExtractor::new(ExtractionRequest::new(
                config.model.provider.as_deref(),
                config.model.model.as_deref(),
                config.model.timeout_secs,
            ));
            let mut app = App::open(store, &config, Arc::new(extractor))?;
            match command.as_str() {
                "tasks" => run_tasks(&mut app, args),
                "study" => run_study(&mut app, args),
                "timer" => run_timer(&mut app, args),
                _ => ui::run(app),
            }
        }
        _ => {
            print_help();
            Err(format!("unknown command: {command}").into())
        }
    }
}

/// Pulls `--data-dir PATH` out of the argument list wherever it appears.
fn split_global_args(args: Vec<String>) -> CliResult<(Option<PathBuf>, Vec<String>)> {
    let mut data_dir = None;
    let mut rest = Vec::with_capacity(args.len());
    let mut iter = args.into_iter();
    while let Some(arg) = iter.next() {
        if arg == "--data-dir" {
            let Some(value) = iter.next() else {
                return Err("--data-dir requires a path".into());
            };
            data_dir = Some(PathBuf::from(value));
        } else if let Some(value) = arg.strip_prefix("--data-dir=") {
            data_dir = Some(PathBuf::from(value));
        } else {
            rest.push(arg);
        }
    }
    Ok((data_dir, rest))
}

fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("flow")
        .join("config.toml")
}

fn resolve_data_dir(flag: Option<PathBuf>, config: &Config) -> PathBuf {
    flag.or_else(|| config.storage.data_dir.clone())
        .or_else(|| dirs::data_local_dir().map(|dir| dir.join("flow")))
        .unwrap_or_else(|| PathBuf::from(".flow"))
}

enum LogTarget {
    Stderr,
    File(PathBuf),
}

fn init_logging(target: LogTarget) -> CliResult<()> {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let installed = match target {
        LogTarget::Stderr => builder.with_writer(io::stderr).try_init(),
        LogTarget::File(path) => {
            let file = OpenOptions::new().create(true).append(true).open(&path)?;
            builder
                .with_ansi(false)
                .with_writer(std::sync::Mutex::new(file))
                .try_init()
        }
    };
    installed.map_err(|err| format!("failed to initialise logging: {err}"))?;
    Ok(())
}

fn take_flag(args: &mut Vec<String>, name: &str) -> CliResult<Option<String>> {
    let Some(idx) = args.iter().position(|arg| arg == name) else {
        return Ok(None);
    };
    if idx + 1 >= args.len() {
        return Err(format!("{name} requires a value").into());
    }
    let value = args.remove(idx + 1);
    args.remove(idx);
    Ok(Some(value))
}

fn take_switch(args: &mut Vec<String>, name: &str) -> bool {
    match args.iter().position(|arg| arg == name) {
        Some(idx) => {
            args.remove(idx);
            true
        }
        None => false,
    }
}

fn joined(args: &[String], what: &str) -> CliResult<String> {
    let text = args.join(" ");
    if text.trim().is_empty() {
        return Err(format!("missing {what}").into());
    }
    Ok(text)
}

fn single<'a>(args: &'a [String], what: &str) -> CliResult<&'a str> {
    match args {
        [one] => Ok(one.as_str()),
        [] => Err(format!("missing {what}").into()),
        _ => Err(format!("expected a single {what}").into()),
    }
}

fn parse_toggle(raw: &str) -> CliResult<bool> {
    match raw {
        "on" | "true" | "yes" => Ok(true),
        "off" | "false" | "no" => Ok(false),
        other => Err(format!("expected on or off, got {other}").into()),
    }
}

fn run_tasks(app: &mut App, mut args: Vec<String>) -> CliResult<()> {
    let sub = if args.is_empty() {
        "list".to_string()
    } else {
        args.remove(0)
    };

    let action = match sub.as_str() {
        "list" => {
            print_tasks(&app.workspace().task_board_view());
            return Ok(());
        }
        "top" => {
            match app.workspace().task_board_view().focus.top_task {
                Some(title) => println!("{title}"),
                None => println!("nothing open"),
            }
            return Ok(());
        }
        "done-top" => match complete_top_task(app.workspace()) {
            Some(action) => action,
            None => {
                println!("nothing open");
                return Ok(());
            }
        },
        "add" => {
            let priority = match take_flag(&mut args, "--priority")? {
                Some(raw) => Priority::parse(&raw)
                    .ok_or_else(|| format!("unknown priority: {raw} (high, medium, low)"))?,
                None => Priority::Medium,
            };
            TaskAction::Add {
                title: joined(&args, "task title")?,
                priority,
            }
        }
        "toggle" => TaskAction::Toggle(TaskId(single(&args, "task id")?.to_string())),
        "delete" => TaskAction::Delete(TaskId(single(&args, "task id")?.to_string())),
        "publish" => TaskAction::Publish(TaskId(single(&args, "task id")?.to_string())),
        "extract" => {
            let text = if args.is_empty() && !io::stdin().is_terminal() {
                let mut buf = String::new();
                io::stdin().read_to_string(&mut buf)?;
                buf
            } else {
                joined(&args, "text to analyse")?
            };
            TaskAction::RequestExtraction { text }
        }
        other => return Err(format!("unknown tasks command: {other}").into()),
    };

    let notices = app.dispatch_blocking(FlowAction::Tasks(action));
    print_notices(&notices);
    print_tasks(&app.workspace().task_board_view());
    Ok(())
}

fn run_study(app: &mut App, mut args: Vec<String>) -> CliResult<()> {
    let sub = if args.is_empty() {
        "show".to_string()
    } else {
        args.remove(0)
    };

    let action = match sub.as_str() {
        "show" => {
            print_study(&app.workspace().study_view());
            return Ok(());
        }
        "xp" => {
            let raw = single(&args, "amount")?;
            let amount: f64 = raw
                .parse()
                .map_err(|_| format!("not a number: {raw}"))?;
            StudyAction::GrantExperience(amount)
        }
        "upgrade" => StudyAction::UpgradeSubject {
            id: single(&args, "subject id")?.to_string(),
        },
        "subject" => {
            let link = take_flag(&mut args, "--link")?;
            StudyAction::AddSubject {
                name: joined(&args, "subject name")?,
                link,
            }
        }
        "mode" => {
            let raw = single(&args, "mode")?;
            let mode = StudyMode::parse(raw).ok_or_else(|| {
                format!("unknown mode: {raw} (normal, hardcore, chill, recovery)")
            })?;
            StudyAction::SetMode(mode)
        }
        "penalty" => StudyAction::SetPenalty(parse_toggle(single(&args, "on|off")?)?),
        "insurance" => StudyAction::SetStreakInsurance(parse_toggle(single(&args, "on|off")?)?),
        "reroll" => StudyAction::RerollChallenges {
            seed: rand::random(),
        },
        other => return Err(format!("unknown study command: {other}").into()),
    };

    let notices = app.dispatch_blocking(FlowAction::Study(action));
    print_notices(&notices);
    print_study(&app.workspace().study_view());
    Ok(())
}

/// Foreground countdown. Ticks once a second until the session completes.
fn run_timer(app: &mut App, mut args: Vec<String>) -> CliResult<()> {
    let study = take_switch(&mut args, "--study");
    if let Some(extra) = args.first() {
        return Err(format!("unsupported argument: {extra}").into());
    }
    let wrap = |action: TimerAction| {
        if study {
            FlowAction::Study(StudyAction::Timer(action))
        } else {
            FlowAction::Tasks(TaskAction::Timer(action))
        }
    };

    let running = if study {
        app.workspace().study.timer.is_running()
    } else {
        app.workspace().tasks.timer.is_running()
    };
    if !running {
        print_notices(&app.dispatch(wrap(TimerAction::Toggle)).notices);
    }

    let mut stdout = io::stdout();
    loop {
        let clock = if study {
            app.workspace().study_view().clock
        } else {
            app.workspace().task_board_view().focus.clock
        };
        write!(stdout, "\r{clock} ")?;
        stdout.flush()?;

        thread::sleep(Duration::from_secs(1));
        let outcome = app.dispatch(wrap(TimerAction::Tick));
        if !outcome.notices.is_empty() {
            writeln!(stdout)?;
            print_notices(&outcome.notices);
        }
        let still_running = if study {
            app.workspace().study.timer.is_running()
        } else {
            app.workspace().tasks.timer.is_running()
        };
        if !still_running {
            return Ok(());
        }
    }
}

fn notice_marker(level: NoticeLevel) -> &'static str {
    match level {
        NoticeLevel::Info => "·",
        NoticeLevel::Success => "✓",
        NoticeLevel::Error => "✗",
    }
}

fn print_notices(notices: &[Notice]) {
    for notice in notices {
        match notice.level {
            NoticeLevel::Error => eprintln!("{} {}", notice_marker(notice.level), notice.message),
            _ => println!("{} {}", notice_marker(notice.level), notice.message),
        }
    }
}

fn print_tasks(view: &TaskBoardView) {
    println!("Impact points: {}", view.total_points);
    match &view.focus.top_task {
        Some(title) => println!("Focus: {title}  [{}]", view.focus.clock),
        None => println!("Focus: nothing open  [{}]", view.focus.clock),
    }
    if view.rows.is_empty() {
        println!("No tasks yet. Add one with `flow tasks add TITLE`.");
        return;
    }
    println!();
    for row in &view.rows {
        let check = if row.completed { "[x]" } else { "[ ]" };
        let badge = match (row.published, row.points, row.can_publish) {
            (true, Some(points), _) => format!("  +{points}"),
            (_, _, true) => "  (publishable)".to_string(),
            _ => String::new(),
        };
        println!(
            "{check} {:<7} {}  {}{badge}  {}",
            row.priority, row.title, row.created, row.id
        );
    }
}

fn print_study(view: &StudyView) {
    println!(
        "{}  Lv {} {}  {}/{} xp ({}%)",
        view.display_name, view.level, view.title, view.xp, view.threshold, view.level_progress
    );
    println!(
        "lifetime {}  today {}  week {}  sessions {}  focus {}m",
        view.lifetime_xp, view.daily_xp, view.weekly_xp, view.sessions, view.focus_minutes
    );
    println!(
        "streak {} (best {})  energy {}  coins {}  gems {}",
        view.streak, view.best_streak, view.energy, view.coins, view.gems
    );
    println!(
        "mode {}  penalty {}  streak insurance {}  timer {}{}",
        view.mode,
        on_off(view.penalty_active),
        on_off(view.streak_insurance),
        view.clock,
        if view.running { " (running)" } else { "" }
    );
    if let Some(hour) = view.peak_hour {
        println!("peak hour {hour:02}:00");
    }

    println!();
    if let Some(challenge) = &view.daily_challenge {
        println!("daily:  {} (+{} xp)", challenge.description, challenge.reward_xp);
    }
    if let Some(challenge) = &view.weekly_challenge {
        println!("weekly: {} (+{} xp)", challenge.description, challenge.reward_xp);
    }

    println!();
    println!("subjects");
    for subject in &view.subjects {
        let link = subject
            .link
            .as_deref()
            .map(|link| format!("  {link}"))
            .unwrap_or_default();
        println!(
            "  {:<16} {:>3}%  {}{link}",
            subject.name, subject.progress, subject.id
        );
    }

    println!();
    println!("leaderboard (rank {})", view.rank);
    for row in &view.leaderboard {
        let marker = if row.is_user { "*" } else { " " };
        println!("{marker}{:>2}. {:<16} {}", row.rank, row.name, row.xp);
    }

    if !view.achievements.is_empty() {
        println!();
        println!("achievements: {}", view.achievements.join(", "));
    }
}

fn on_off(flag: bool) -> &'static str {
    if flag {
        "on"
    } else {
        "off"
    }
}

fn print_help() {
    println!("flow {}", env!("CARGO_PKG_VERSION"));
    println!("Usage:");
    println!("  flow [--data-dir PATH] tasks [list]");
    println!("  flow tasks add TITLE [--priority high|medium|low]");
    println!("  flow tasks toggle|delete|publish ID");
    println!("  flow tasks top|done-top");
    println!("  flow tasks extract [TEXT]          (reads stdin when TEXT is omitted)");
    println!("  flow study [show]");
    println!("  flow study xp AMOUNT");
    println!("  flow study upgrade SUBJECT_ID");
    println!("  flow study subject NAME [--link URL]");
    println!("  flow study mode normal|hardcore|chill|recovery");
    println!("  flow study penalty|insurance on|off");
    println!("  flow study reroll");
    println!("  flow timer [--study]");
    println!("  flow ui");
    println!("  flow --help");
    println!("  flow --version");
    println!();
    println!("Config: {}", config_path().display());
    println!("Logs:   set {LOG_ENV}=debug for verbose output");
}
