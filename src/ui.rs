use ratatui::{Frame, widgets::Paragraph};

use crate::app::App;
use crate::viewport;

/// Paint the pre-laid-out frame over the whole terminal.
pub fn render(f: &mut Frame, app: &App) {
    let area = f.area();
    f.render_widget(Paragraph::new(app.frame()), area);

    if !app.geometry.is_too_narrow() {
        let (x, y) = viewport::input_cursor(&app.prompt_input, app.geometry);
        f.set_cursor_position((area.x + x, area.y + y));
    }
}
