//! Plain-text renderer for terminals and logs.

use std::io::{self, Write};

use crate::error::CoreError;
use crate::palette::Palette;
use crate::projection::{DetailDataset, PercentageEntity};
use crate::selection::SelectionState;
use crate::session::Session;

pub trait Renderer {
    fn draw_aggregate(&mut self, shares: &[PercentageEntity], palette: &Palette) -> io::Result<()>;
    fn draw_detail(
        &mut self,
        name: &str,
        detail: &DetailDataset,
        palette: &Palette,
    ) -> io::Result<()>;
    fn draw_unavailable(&mut self, err: &CoreError) -> io::Result<()>;
}

/// Slice label shown next to each aggregate slice.
pub fn slice_label(share: &PercentageEntity) -> String {
    format!("{} {:.2}%", share.name, share.population_pct)
}

/// Hover text for an aggregate slice.
pub fn tooltip_lines(share: &PercentageEntity) -> [String; 3] {
    [
        format!("Country: {}", share.name),
        format!("Population: {:.2}%", share.population_pct),
        format!("Area: {:.2}%", share.area_pct),
    ]
}

pub fn detail_heading(name: &str) -> String {
    format!("{} Population vs Area", name)
}

pub struct TextRenderer<W: Write> {
    out: W,
}

impl<W: Write> TextRenderer<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> Renderer for TextRenderer<W> {
    fn draw_aggregate(&mut self, shares: &[PercentageEntity], palette: &Palette) -> io::Result<()> {
        writeln!(self.out, "Population percentages")?;
        for (i, share) in shares.iter().enumerate() {
            let [_, population, area] = tooltip_lines(share);
            writeln!(
                self.out,
                "  [{}] {:<2} {:<32} {} | {}",
                palette.color_for(i),
                i,
                slice_label(share),
                population,
                area
            )?;
        }
        Ok(())
    }

    fn draw_detail(
        &mut self,
        name: &str,
        detail: &DetailDataset,
        palette: &Palette,
    ) -> io::Result<()> {
        writeln!(self.out, "{}", detail_heading(name))?;
        for (slot, datum) in detail.iter().enumerate() {
            writeln!(
                self.out,
                "  [{}] {:<10} {}",
                palette.detail_color_for(slot),
                datum.label.as_str(),
                datum.value
            )?;
        }
        Ok(())
    }

    fn draw_unavailable(&mut self, err: &CoreError) -> io::Result<()> {
        writeln!(self.out, "No data available ({})", err.code())
    }
}

/// Draws the aggregate view and, when something is selected, the detail view.
pub fn render_session(session: &Session, renderer: &mut dyn Renderer) -> io::Result<()> {
    if let Some(err) = session.last_error().filter(|e| e.is_user_visible()) {
        return renderer.draw_unavailable(err);
    }
    renderer.draw_aggregate(session.percentages(), session.palette())?;
    if let (Some(detail), SelectionState::Selected { name, .. }) =
        (session.detail(), session.selection())
    {
        renderer.draw_detail(name, &detail, session.palette())?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{RawEntity, Window};

    fn share(name: &str, population_pct: f64, area_pct: f64) -> PercentageEntity {
        PercentageEntity {
            name: name.to_string(),
            population_pct,
            area_pct,
        }
    }

    fn rendered(session: &Session) -> String {
        let mut renderer = TextRenderer::new(Vec::new());
        render_session(session, &mut renderer).unwrap();
        String::from_utf8(renderer.into_inner()).unwrap()
    }

    #[test]
    fn test_labels_use_two_decimals() {
        let s = share("Aruba", 12.3456, 0.5);
        assert_eq!(slice_label(&s), "Aruba 12.35%");
        assert_eq!(
            tooltip_lines(&s),
            [
                "Country: Aruba".to_string(),
                "Population: 12.35%".to_string(),
                "Area: 0.50%".to_string(),
            ]
        );
    }

    #[test]
    fn test_render_aggregate_and_detail() {
        let mut session = Session::new(Window::new(0, 9).unwrap(), Palette::default());
        session
            .on_entities_replaced(&[RawEntity::new("A", 100, 10.0), RawEntity::new("B", 300, 30.0)])
            .unwrap();
        session.select("B", 1);
        let text = rendered(&session);
        assert!(text.contains("A 25.00%"));
        assert!(text.contains("#e64cc2"));
        assert!(text.contains("B Population vs Area"));
        assert!(text.contains("Population 300"));
    }

    #[test]
    fn test_render_without_selection_has_no_detail() {
        let mut session = Session::new(Window::new(0, 9).unwrap(), Palette::default());
        session.on_entities_replaced(&[RawEntity::new("A", 1, 1.0)]).unwrap();
        let text = rendered(&session);
        assert!(!text.contains("Population vs Area"));
    }

    #[test]
    fn test_render_unavailable() {
        let mut session = Session::new(Window::new(0, 9).unwrap(), Palette::default());
        session.on_source_failed("offline");
        assert_eq!(rendered(&session), "No data available (GEO-2001)\n");
    }
}
