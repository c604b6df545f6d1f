//! Authentication panel layout

use authenticator_core::PIN_LENGTH;
use authenticator_gfx::{Color, DisplayBackend, Frame, TextStyle};

use crate::session::{PinSession, PinStage};

pub const BACKGROUND: Color = Color::from_rgba8888([2, 4, 13, 249]);
pub const TITLE_COLOR: Color = Color::from_rgba8888([28, 194, 247, 255]);
pub const TEXT_COLOR: Color = Color::from_rgba8888([230, 230, 230, 255]);
pub const FAILURE_COLOR: Color = Color::from_rgba8888([240, 80, 80, 255]);
pub const SUCCESS_COLOR: Color = Color::from_rgba8888([90, 220, 120, 255]);

pub const TITLE: &str = "Authentication";
pub const TITLE_SIZE: f32 = 62.0;
pub const NAME_SIZE: f32 = 40.0;
pub const INSTRUCTION_SIZE: f32 = 32.0;

pub const INDICATOR_RADIUS: u16 = 18;
/// Distance between the centers of two indicators
pub const INDICATOR_SPACING: i32 = 72;

/// Baselines and indicator row, as fractions of the panel height
const TITLE_BASELINE: f32 = 0.25;
const NAME_BASELINE: f32 = 0.38;
const INSTRUCTION_BASELINE: f32 = 0.52;
const INDICATOR_ROW: f32 = 0.70;

fn instruction_color(stage: PinStage) -> Color {
    if stage.is_failure() {
        FAILURE_COLOR
    } else if stage == PinStage::Ok {
        SUCCESS_COLOR
    } else {
        TEXT_COLOR
    }
}

/// Number of indicators drawn filled
pub fn filled_indicators(session: &PinSession) -> usize {
    if session.is_authenticated() {
        PIN_LENGTH
    } else {
        session.entered()
    }
}

/// X centers of the PIN indicators
pub fn indicator_centers(panel_width: u32) -> [i32; PIN_LENGTH] {
    let middle = panel_width as i32 / 2;
    let first = middle - INDICATOR_SPACING * (PIN_LENGTH as i32 - 1) / 2;
    std::array::from_fn(|i| first + INDICATOR_SPACING * i as i32)
}

/// Draw `text` horizontally centered on the panel
fn draw_centered<B: DisplayBackend>(
    frame: &mut Frame<'_, B>,
    text: &str,
    y: i32,
    style: &TextStyle,
) {
    let (width, _) = frame.measure_string(text, style);
    let x = (frame.width() as i32 - width as i32) / 2;
    frame.draw_string(text, x, y, style);
}

/// Render the whole panel for the current session state
pub fn draw_panel<B: DisplayBackend>(frame: &mut Frame<'_, B>, session: &PinSession) {
    let width = frame.width();
    let height = frame.height();
    let row = |fraction: f32| (height as f32 * fraction) as i32;

    frame.clear_screen();
    frame.draw_rect(0, 0, width as i32, height as i32, BACKGROUND);

    let title_style = TextStyle::new(TITLE_SIZE, TITLE_COLOR);
    draw_centered(frame, TITLE, row(TITLE_BASELINE), &title_style);
    draw_centered(
        frame,
        &session.user().nickname,
        row(NAME_BASELINE),
        &TextStyle::new(NAME_SIZE, TEXT_COLOR),
    );

    let stage = session.stage();
    draw_centered(
        frame,
        stage.instruction(),
        row(INSTRUCTION_BASELINE),
        &TextStyle::new(INSTRUCTION_SIZE, instruction_color(stage))
            .max_width(width as i32),
    );

    let filled = filled_indicators(session);
    let indicator_color = instruction_color(stage);
    for (i, cx) in indicator_centers(width).into_iter().enumerate() {
        let color = if i < filled { indicator_color } else { TEXT_COLOR };
        frame.draw_circle(cx, row(INDICATOR_ROW), INDICATOR_RADIUS, i < filled, color);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use authenticator_core::{AccountUid, UserProfile};
    use authenticator_gfx::{HeadlessBackend, Presenter};

    fn session(stage: PinStage) -> PinSession {
        PinSession::with_stage(UserProfile::new(AccountUid::new(1, 1), "Alice"), stage)
    }

    fn render(session: &PinSession) -> Presenter<HeadlessBackend> {
        let mut presenter = Presenter::new(HeadlessBackend::new());
        presenter.init(640, 360, 0, 0).unwrap();
        {
            let mut frame = presenter.start_frame().unwrap();
            draw_panel(&mut frame, session);
        }
        presenter
    }

    #[test]
    fn test_indicator_centers_are_symmetric() {
        let centers = indicator_centers(640);
        assert_eq!(centers, [212, 284, 356, 428]);
        assert_eq!(centers[0] + centers[3], 640);
    }

    #[test]
    fn test_ok_fills_every_indicator() {
        assert_eq!(filled_indicators(&session(PinStage::Ok)), PIN_LENGTH);
        assert_eq!(filled_indicators(&session(PinStage::Verification)), 0);
    }

    #[test]
    fn test_panel_covers_background() {
        let presenter = render(&session(PinStage::Setup));
        let frame = presenter.backend().last_frame();

        assert_eq!(presenter.backend().frames_presented(), 1);
        assert!(frame.iter().filter(|p| **p != 0).count() >= 640 * 360);
    }

    #[test]
    fn test_indicator_fill_follows_entered_presses() {
        let store_dir = tempfile::tempdir().unwrap();
        let store = authenticator_core::CredentialStore::new(store_dir.path().join("p.json"));
        let mut entered = session(PinStage::Setup);
        entered.press(1, &store);
        entered.press(2, &store);

        let mut presenter = render(&entered);
        let row = (360.0 * INDICATOR_ROW) as i32;
        let centers = indicator_centers(640);

        let frame = presenter.start_frame().unwrap();
        assert_eq!(frame.pixel(centers[0], row), frame.pixel(centers[1], row));
        assert_ne!(frame.pixel(centers[1], row), frame.pixel(centers[2], row));
        assert_eq!(frame.pixel(centers[2], row), Some(BACKGROUND));
    }
}
