//! End-to-end scenarios against the assembled chat screen
//!
//! Everything runs headless: a `MemorySurface` records frames and a
//! `ScriptedInput` or direct dispatch stands in for the keyboard.

use chatterm::chat::{ChatMessage, ChatScreen, FixedWorkspace, HistoryStore, ScreenParts};
use chatterm::config::Config;
use chatterm::demo::EchoBackend;
use chatterm::tui::app::{AppEvent, AppState, RunArgs};
use chatterm::tui::keyboard::ScriptedInput;
use chatterm::tui::surface::MemorySurface;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

struct Harness {
    screen: ChatScreen,
    surface: MemorySurface,
    keys: ScriptedInput,
    cancel: CancellationToken,
}

fn harness(token_delay: Duration) -> Harness {
    let surface = MemorySurface::new(80, 24);
    let keys = ScriptedInput::new();
    let cancel = CancellationToken::new();
    let screen = ChatScreen::build(
        &Config::default(),
        ScreenParts {
            surface: Box::new(surface.clone()),
            input: Box::new(keys.clone()),
            backend: Arc::new(EchoBackend::new(token_delay)),
            workspace: Arc::new(FixedWorkspace(PathBuf::from("/work"))),
            logs: None,
        },
        cancel.clone(),
    );
    Harness {
        screen,
        surface,
        keys,
        cancel,
    }
}

fn press(screen: &ChatScreen, code: KeyCode) -> bool {
    screen
        .app
        .keyboard()
        .dispatch(KeyEvent::new(code, KeyModifiers::NONE))
}

async fn wait_until(mut condition: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition not reached within 5s");
}

#[tokio::test]
async fn history_is_composed_above_the_live_region_in_one_frame() {
    let h = harness(Duration::ZERO);
    h.screen.history.append(ChatMessage::user("first question"));

    h.screen.app.force_render().unwrap();

    assert_eq!(h.screen.app.renderer().total_frames(), 1);
    assert_eq!(h.surface.write_count(), 1);

    let frame = h.surface.last_frame().unwrap();
    let text = frame.plain_text();
    let history_at = text.find("first question").unwrap();
    let prompt_at = text.find("› ").unwrap();
    assert!(history_at < prompt_at, "history must precede the input line:\n{text}");
    assert!(text.contains("● ready"));
}

#[tokio::test]
async fn typing_and_enter_submit_exactly_once() {
    let h = harness(Duration::ZERO);
    let submissions = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&submissions);
    h.screen
        .input
        .on_submit(move |text| sink.lock().push(text.to_string()));

    for ch in "Hello".chars() {
        assert!(press(&h.screen, KeyCode::Char(ch)));
    }
    assert_eq!(h.screen.input.text(), "Hello");

    assert!(press(&h.screen, KeyCode::Enter));
    assert_eq!(h.screen.input.text(), "");
    assert_eq!(*submissions.lock(), vec!["Hello".to_string()]);

    h.screen.session.wait_idle().await;
    let messages = h.screen.history.messages();
    assert_eq!(messages[0].content, "Hello");
    assert_eq!(messages[1].content, "You said: Hello");
}

#[tokio::test]
async fn scripted_conversation_renders_the_reply() {
    let h = harness(Duration::from_millis(1));
    h.keys.type_text("hi there");
    h.keys.push_key(KeyCode::Enter, KeyModifiers::NONE);

    let app = Arc::clone(&h.screen.app);
    let cancel = h.cancel.clone();
    let run = tokio::spawn(async move { app.run(RunArgs::default(), cancel).await });

    let surface = h.surface.clone();
    wait_until(move || {
        surface
            .last_frame()
            .is_some_and(|f| f.plain_text().contains("You said: hi there"))
    })
    .await;
    assert_eq!(h.screen.history.len(), 2);
    assert!(h.keys.is_empty());

    h.cancel.cancel();
    assert_eq!(run.await.unwrap().unwrap(), 0);
    assert_eq!(h.screen.app.state(), AppState::Stopped);
}

#[tokio::test]
async fn escape_cancels_a_streaming_response() {
    let h = harness(Duration::from_millis(200));
    h.screen.app.submit_text("one two three four five");
    assert!(h.screen.session.is_processing());

    // Draft is empty, so Esc falls through to the session
    assert!(press(&h.screen, KeyCode::Esc));
    h.screen.session.wait_idle().await;

    let messages = h.screen.history.messages();
    assert_eq!(messages.last().unwrap().content, "[response cancelled]");
    assert!(!h.screen.input.is_locked());
}

#[tokio::test]
async fn ctrl_c_shuts_down_when_idle() {
    let h = harness(Duration::ZERO);
    h.keys.push_key(KeyCode::Char('c'), KeyModifiers::CONTROL);

    let mut events = h.screen.app.subscribe();
    let exit = tokio::time::timeout(
        Duration::from_secs(5),
        h.screen.app.run(RunArgs::default(), h.cancel.clone()),
    )
    .await
    .expect("Ctrl+C should end the run")
    .unwrap();

    assert_eq!(exit, 0);
    assert_eq!(events.recv().await.unwrap(), AppEvent::Started);
    assert_eq!(events.recv().await.unwrap(), AppEvent::Stopped { exit_code: 0 });
    assert_eq!(h.surface.clear_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn a_burst_of_keystrokes_renders_once() {
    let h = harness(Duration::ZERO);
    let mut events = h.screen.app.subscribe();

    let app = Arc::clone(&h.screen.app);
    let cancel = h.cancel.clone();
    let run = tokio::spawn(async move { app.run(RunArgs::default(), cancel).await });

    assert_eq!(events.recv().await.unwrap(), AppEvent::Started);
    // Let the initial frames settle, staying clear of the 250ms tick
    tokio::time::sleep(Duration::from_millis(50)).await;
    let before = h.surface.write_count();

    for ch in "burst".chars() {
        press(&h.screen, KeyCode::Char(ch));
    }
    tokio::time::sleep(Duration::from_millis(60)).await;

    assert_eq!(h.surface.write_count(), before + 1);
    assert!(h.surface.last_frame().unwrap().plain_text().contains("burst"));

    // The statistics tick refreshes its snapshot once a second
    tokio::time::sleep(Duration::from_millis(1000)).await;
    let stats = h.screen.app.latest_statistics().unwrap();
    assert!(stats.total_frames >= 2);

    h.cancel.cancel();
    assert_eq!(run.await.unwrap().unwrap(), 0);
}

#[tokio::test]
async fn shutdown_cancels_a_response_still_streaming() {
    let h = harness(Duration::from_millis(50));
    let mut events = h.screen.app.subscribe();

    let app = Arc::clone(&h.screen.app);
    let cancel = h.cancel.clone();
    let run = tokio::spawn(async move { app.run(RunArgs::default(), cancel).await });
    assert_eq!(events.recv().await.unwrap(), AppEvent::Started);

    h.screen
        .app
        .submit_text("one two three four five six seven eight");
    tokio::time::sleep(Duration::from_millis(60)).await;
    assert!(h.screen.session.is_processing());

    h.screen.app.request_shutdown();
    assert_eq!(run.await.unwrap().unwrap(), 0);
    assert_eq!(h.screen.app.state(), AppState::Stopped);
    assert!(!h.screen.session.is_processing());
    assert!(!h.cancel.is_cancelled());

    let at_stop = h.screen.history.len();
    assert_eq!(
        h.screen.history.messages().last().unwrap().content,
        "[response cancelled]"
    );

    // The backend would have finished by now had it kept running
    tokio::time::sleep(Duration::from_millis(800)).await;
    assert_eq!(h.screen.history.len(), at_stop);
    assert!(!h.screen.session.submit("too late"));
}
