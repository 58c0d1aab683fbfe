//! Full-screen test runner. Terminal input is translated into proctoring
//! events; only events the guard allows reach the answer sheet.

use std::io::{self, Stdout, Write};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use crossterm::event::{
    DisableBracketedPaste, DisableFocusChange, DisableMouseCapture, EnableBracketedPaste,
    EnableFocusChange, EnableMouseCapture, Event, EventStream, KeyCode, KeyEvent, KeyEventKind,
    KeyModifiers, ModifierKeyCode, MouseButton, MouseEventKind,
};
use crossterm::style::Print;
use crossterm::terminal::{
    self, Clear, ClearType, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::{cursor, execute, queue};
use futures_util::StreamExt;

use recruit_core::countdown::format_clock;
use recruit_core::model::{
    NoticeLevel, QuestionId, ScheduleId, SelectedOption, SessionStatus, SubmitReason, TestSession,
};
use recruit_core::proctor::{ClipboardAction, Key, KeyPress, Modifiers, ProctorEvent, Verdict};
use services::{ActiveTest, EventBus, Resolution, SubmitOutcome, TestSessionService};

const REDRAW: Duration = Duration::from_millis(250);

/// Raw mode plus alternate screen; restored on drop.
struct Screen {
    out: Stdout,
}

impl Screen {
    fn enter() -> io::Result<Self> {
        terminal::enable_raw_mode()?;
        let mut out = io::stdout();
        execute!(
            out,
            EnterAlternateScreen,
            EnableFocusChange,
            EnableMouseCapture,
            EnableBracketedPaste,
            cursor::Hide
        )?;
        Ok(Self { out })
    }
}

impl Drop for Screen {
    fn drop(&mut self) {
        let _ = execute!(
            self.out,
            DisableBracketedPaste,
            DisableMouseCapture,
            DisableFocusChange,
            LeaveAlternateScreen,
            cursor::Show
        );
        let _ = terminal::disable_raw_mode();
    }
}

/// What an allowed key does to the attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    Choose(u8),
    Previous,
    Next,
    Submit,
    Leave,
}

fn action_for(press: &KeyPress) -> Option<Action> {
    match press.key {
        Key::Char(c @ '0'..='4') => c.to_digit(10).and_then(|d| u8::try_from(d).ok()).map(Action::Choose),
        Key::Char('k') | Key::Up | Key::Left => Some(Action::Previous),
        Key::Char('j') | Key::Down | Key::Right | Key::Tab => Some(Action::Next),
        Key::Char('s') => Some(Action::Submit),
        Key::Escape => Some(Action::Leave),
        _ => None,
    }
}

fn map_key(code: KeyCode) -> Key {
    match code {
        KeyCode::Char(c) => Key::Char(c),
        KeyCode::Tab | KeyCode::BackTab => Key::Tab,
        KeyCode::Enter => Key::Enter,
        KeyCode::Esc => Key::Escape,
        KeyCode::Up => Key::Up,
        KeyCode::Down => Key::Down,
        KeyCode::Left => Key::Left,
        KeyCode::Right => Key::Right,
        KeyCode::Backspace => Key::Backspace,
        KeyCode::Delete => Key::Delete,
        KeyCode::Home => Key::Home,
        KeyCode::End => Key::End,
        KeyCode::PageUp => Key::PageUp,
        KeyCode::PageDown => Key::PageDown,
        KeyCode::F(n) => Key::Function(n),
        KeyCode::PrintScreen => Key::PrintScreen,
        KeyCode::Modifier(
            ModifierKeyCode::LeftSuper
            | ModifierKeyCode::RightSuper
            | ModifierKeyCode::LeftMeta
            | ModifierKeyCode::RightMeta,
        ) => Key::Meta,
        other => Key::Other(format!("{other:?}")),
    }
}

fn map_key_event(event: &KeyEvent) -> KeyPress {
    KeyPress {
        key: map_key(event.code),
        modifiers: Modifiers {
            ctrl: event.modifiers.contains(KeyModifiers::CONTROL),
            alt: event.modifiers.contains(KeyModifiers::ALT),
            shift: event.modifiers.contains(KeyModifiers::SHIFT),
            meta: event
                .modifiers
                .intersects(KeyModifiers::SUPER | KeyModifiers::META),
        },
    }
}

/// Terminal focus stands in for the browser's fullscreen state.
fn to_proctor_event(event: &Event) -> Option<ProctorEvent> {
    match event {
        Event::FocusLost => Some(ProctorEvent::FullscreenChanged { active: false }),
        Event::FocusGained => Some(ProctorEvent::FullscreenChanged { active: true }),
        Event::Mouse(mouse) if mouse.kind == MouseEventKind::Down(MouseButton::Right) => {
            Some(ProctorEvent::ContextMenu)
        }
        Event::Paste(_) => Some(ProctorEvent::Clipboard(ClipboardAction::Paste)),
        Event::Key(key) if key.kind == KeyEventKind::Press => {
            Some(ProctorEvent::KeyDown(map_key_event(key)))
        }
        _ => None,
    }
}

struct View {
    cursor: usize,
    status_line: Option<String>,
}

fn render(out: &mut impl Write, session: &TestSession, view: &View) -> io::Result<()> {
    queue!(out, cursor::MoveTo(0, 0), Clear(ClearType::All))?;
    let mut line = |text: String| queue!(out, Print(text), Print("\r\n"));

    line(format!(
        "{}    time left {}",
        session.job_title(),
        format_clock(session.remaining_seconds())
    ))?;
    line(String::new())?;

    let questions = session.questions();
    if let Some(question) = questions.get(view.cursor) {
        line(format!(
            "Question {}/{}: {}",
            view.cursor + 1,
            questions.len(),
            question.text()
        ))?;
        let selected = session.answers().selected(question.id());
        for (idx, text) in question.options().iter().enumerate() {
            let mark = if selected.index() == Some(idx) { "x" } else { " " };
            line(format!("  [{mark}] {}. {text}", idx + 1))?;
        }
    }
    line(String::new())?;
    line(format!(
        "Answered {}/{}",
        session.answers().answered_count(),
        questions.len()
    ))?;

    if let Some(notice) = session.notice() {
        let prefix = match notice.level {
            NoticeLevel::Info => "",
            NoticeLevel::Error => "error: ",
        };
        line(format!("{prefix}{}", notice.message))?;
    }
    if let Some(status) = &view.status_line {
        line(status.clone())?;
    }
    line(String::new())?;
    let help = match session.status() {
        SessionStatus::Error => "s retry submission   esc leave",
        SessionStatus::Submitting => "submitting...",
        _ => "1-4 choose   0 clear   arrows move   s submit   esc leave",
    };
    line(help.to_owned())?;
    out.flush()
}

fn current_question(session: &TestSession, cursor: usize) -> Option<QuestionId> {
    session.questions().get(cursor).map(|q| q.id())
}

enum Flow {
    Continue,
    Leave,
}

async fn submit(test: &mut ActiveTest, reason: SubmitReason, view: &mut View) -> Result<Flow> {
    let outcome = test.submit(reason).await?;
    view.status_line = match outcome {
        SubmitOutcome::Submitted { .. } | SubmitOutcome::AlreadySubmitted => {
            return Ok(Flow::Leave);
        }
        SubmitOutcome::Rejected { .. } => None,
        SubmitOutcome::AlreadyInFlight => Some("A submission is already in progress.".into()),
    };
    Ok(Flow::Continue)
}

async fn on_event(
    test: &mut ActiveTest,
    bus: &EventBus,
    event: &Event,
    view: &mut View,
) -> Result<Flow> {
    let Some(proctored) = to_proctor_event(event) else {
        return Ok(Flow::Continue);
    };
    if bus.dispatch(&proctored) != Verdict::Allow {
        return Ok(Flow::Continue);
    }
    let ProctorEvent::KeyDown(press) = proctored else {
        return Ok(Flow::Continue);
    };
    let Some(action) = action_for(&press) else {
        return Ok(Flow::Continue);
    };

    let session = test.snapshot()?;
    let count = session.questions().len();
    match action {
        Action::Choose(n) => {
            if let Some(question) = current_question(&session, view.cursor) {
                let option = SelectedOption::new(n)?;
                if let Err(err) = test.select(question, option) {
                    view.status_line = Some(err.to_string());
                }
            }
        }
        Action::Previous => view.cursor = view.cursor.saturating_sub(1),
        Action::Next => view.cursor = (view.cursor + 1).min(count.saturating_sub(1)),
        Action::Submit => return submit(test, SubmitReason::Manual, view).await,
        Action::Leave => return Ok(Flow::Leave),
    }
    Ok(Flow::Continue)
}

async fn drive(test: &mut ActiveTest, bus: &EventBus, screen: &mut Screen) -> Result<()> {
    let mut events = EventStream::new();
    let mut redraw = tokio::time::interval(REDRAW);
    let mut view = View {
        cursor: 0,
        status_line: (test.resolution() == Resolution::Resumed)
            .then(|| "Resumed your earlier attempt.".to_owned()),
    };

    loop {
        render(&mut screen.out, &test.snapshot()?, &view)?;
        let flow = tokio::select! {
            trigger = test.next_trigger(), if test.is_monitoring() => match trigger {
                Some(reason) => submit(test, reason, &mut view).await?,
                None => Flow::Continue,
            },
            event = events.next() => match event {
                Some(Ok(event)) => on_event(test, bus, &event, &mut view).await?,
                Some(Err(err)) => return Err(err.into()),
                None => Flow::Leave,
            },
            _ = redraw.tick() => Flow::Continue,
        };
        if matches!(flow, Flow::Leave) {
            return Ok(());
        }
    }
}

fn print_summary(session: &TestSession) {
    match session.status() {
        SessionStatus::Submitted => {
            let reason = session
                .last_reason()
                .map_or("submitted", SubmitReason::annotation);
            println!("Test finished ({reason}).");
            if let Some(score) = session.score() {
                println!(
                    "Score {}: {} correct, {} wrong, {} unanswered of {}",
                    score.score,
                    score.correct_answers,
                    score.wrong_answers,
                    score.unanswered(),
                    score.total_questions
                );
            }
        }
        SessionStatus::Error => {
            if let Some(notice) = session.notice() {
                println!("Submission failed: {}", notice.message);
            }
            println!("Run the same command again to retry before the window closes.");
        }
        _ => println!(
            "Left with {} remaining; run the same command to resume.",
            format_clock(session.remaining_seconds())
        ),
    }
}

/// Open the attempt, run it full-screen, then tear it down and print the outcome.
pub async fn take_test(service: &TestSessionService, id: ScheduleId) -> Result<()> {
    let bus = EventBus::new();
    let mut test = match service.open(id, Arc::new(bus.clone())).await {
        Ok(test) => test,
        Err(err) if err.is_informational() => {
            println!("{err}");
            return Ok(());
        }
        Err(err) => return Err(err.into()),
    };

    let outcome = {
        let mut screen = Screen::enter()?;
        drive(&mut test, &bus, &mut screen).await
    };
    let session = test.snapshot()?;
    test.teardown().await?;
    outcome?;
    print_summary(&session);
    Ok(())
}
