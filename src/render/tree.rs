//! tree.rs
//!
//! Иерархическая структура отрисовки: зал → секции → ряды → места.
//!
//! Дерево строится один раз из `SeatStore` и дальше обновляется точечно:
//! после патча статуса или переключения выбора пересчитывается только
//! один узел, найденный через индекс по ключу места.

use std::collections::HashMap;

use super::style::{NodeStyle, SeatVisual};
use crate::models::{Geometry, Point, SeatKey, SeatStatus};
use crate::selection::SelectionSet;
use crate::store::SeatStore;
use crate::viewport::{ViewMode, ViewportFrame, ViewportTransform};

#[derive(Debug, Clone, PartialEq)]
pub struct SeatNode {
    pub key: SeatKey,
    pub price: f64,
    pub status: SeatStatus,
    pub visual: SeatVisual,
    pub style: NodeStyle,
    geometry: Geometry,
}

impl SeatNode {
    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RowNode {
    pub row_number: String,
    pub seats: Vec<SeatNode>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SectionNode {
    pub section_id: String,
    pub rows: Vec<RowNode>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NonSeatNode {
    pub label: Option<String>,
    pub style: NodeStyle,
}

/// Контейнер, к которому применяется преобразование вьюпорта.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContainerStyle {
    pub transform: ViewportTransform,
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, Copy)]
pub struct OverviewLayer<'a> {
    pub opacity: f64,
    pub non_seats: &'a [NonSeatNode],
}

#[derive(Debug, Clone, Copy)]
pub struct DetailLayer<'a> {
    pub opacity: f64,
    pub sections: &'a [SectionNode],
}

/// Всё, что нужно нарисовать в одном кадре.
#[derive(Debug, Clone, Copy)]
pub struct RenderFrame<'a> {
    pub venue_name: &'a str,
    pub mode: ViewMode,
    pub container: ContainerStyle,
    pub overview: OverviewLayer<'a>,
    pub detail: DetailLayer<'a>,
}

#[derive(Debug, Clone, Default)]
pub struct SeatMapTree {
    venue_name: String,
    sections: Vec<SectionNode>,
    non_seats: Vec<NonSeatNode>,
    index: HashMap<SeatKey, (usize, usize, usize)>,
    content_width: f64,
    content_height: f64,
}

impl SeatMapTree {
    pub fn build(store: &SeatStore, selection: &SelectionSet, window: (f64, f64)) -> Self {
        let mut index = HashMap::with_capacity(store.len());
        let mut sections = Vec::with_capacity(store.sections().len());

        for (s, section) in store.sections().iter().enumerate() {
            let mut rows = Vec::with_capacity(section.rows.len());
            for (r, row) in section.rows.iter().enumerate() {
                let mut seats = Vec::with_capacity(row.seats.len());
                for key in &row.seats {
                    let Some(record) = store.get(key) else { continue };
                    let visual = SeatVisual::resolve(record.status, selection.contains(key));
                    index.insert(key.clone(), (s, r, seats.len()));
                    seats.push(SeatNode {
                        key: key.clone(),
                        price: record.price,
                        status: record.status,
                        visual,
                        style: NodeStyle::new(&record.geometry, visual.fill(&record.geometry)),
                        geometry: record.geometry,
                    });
                }
                rows.push(RowNode {
                    row_number: row.row_number.clone(),
                    seats,
                });
            }
            sections.push(SectionNode {
                section_id: section.section_id.clone(),
                rows,
            });
        }

        let non_seats = store
            .non_seats()
            .iter()
            .map(|area| NonSeatNode {
                label: area.name.clone(),
                style: NodeStyle::area(&area.geometry),
            })
            .collect();

        let (content_width, content_height) = store.content_size(window.0, window.1);

        Self {
            venue_name: store.venue_name().to_string(),
            sections,
            non_seats,
            index,
            content_width,
            content_height,
        }
    }

    /// Пересчитывает один узел. Возвращает `true`, если его вид изменился.
    pub fn refresh_seat(&mut self, key: &SeatKey, store: &SeatStore, selection: &SelectionSet) -> bool {
        let (Some(&(s, r, i)), Some(record)) = (self.index.get(key), store.get(key)) else {
            return false;
        };
        let node = &mut self.sections[s].rows[r].seats[i];
        let visual = SeatVisual::resolve(record.status, selection.contains(key));
        if node.visual == visual && node.status == record.status {
            return false;
        }

        node.status = record.status;
        node.visual = visual;
        node.style.background = visual.fill(&node.geometry);
        true
    }

    pub fn seat(&self, key: &SeatKey) -> Option<&SeatNode> {
        let &(s, r, i) = self.index.get(key)?;
        Some(&self.sections[s].rows[r].seats[i])
    }

    pub fn venue_name(&self) -> &str {
        &self.venue_name
    }

    pub fn sections(&self) -> &[SectionNode] {
        &self.sections
    }

    pub fn non_seats(&self) -> &[NonSeatNode] {
        &self.non_seats
    }

    pub fn seats(&self) -> impl Iterator<Item = &SeatNode> + '_ {
        self.sections
            .iter()
            .flat_map(|s| s.rows.iter())
            .flat_map(|r| r.seats.iter())
    }

    pub fn content_size(&self) -> (f64, f64) {
        (self.content_width, self.content_height)
    }

    /// Место под экранной точкой. Места, нарисованные позже, лежат сверху.
    pub fn hit_test(&self, screen: Point, transform: &ViewportTransform) -> Option<&SeatKey> {
        if transform.scale <= 0.0 {
            return None;
        }
        let canvas = transform.to_canvas(screen);
        self.seats()
            .filter(|node| node.geometry.contains(canvas))
            .last()
            .map(|node| &node.key)
    }

    /// Собирает кадр: контейнер с преобразованием и два слоя с прозрачностью.
    pub fn compose(&self, frame: &ViewportFrame) -> RenderFrame<'_> {
        RenderFrame {
            venue_name: &self.venue_name,
            mode: frame.mode,
            container: ContainerStyle {
                transform: frame.transform,
                width: self.content_width * frame.settled_scale,
                height: self.content_height * frame.settled_scale,
            },
            overview: OverviewLayer {
                opacity: frame.overview_opacity,
                non_seats: &self.non_seats,
            },
            detail: DetailLayer {
                opacity: frame.detail_opacity,
                sections: &self.sections,
            },
        }
    }
}
