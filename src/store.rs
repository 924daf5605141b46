//! store.rs
//!
//! Индексированное хранилище статусов мест.
//!
//! Вместо вложенного дерева секция → ряд → место, которое пришлось бы
//! копировать целиком на каждое изменение, места лежат в плоской таблице
//! по составному ключу, а секции и ряды хранят упорядоченные списки ключей.
//! `apply_patch` - единственная точка изменения статуса; её вызывают и
//! push-канал, и подтверждение покупки.

use std::collections::HashMap;
use tracing::debug;

use crate::models::{Geometry, NonSeatArea, SeatKey, SeatPatch, SeatStatus, Venue};

/// Запись о месте в хранилище.
#[derive(Debug, Clone, PartialEq)]
pub struct SeatRecord {
    pub key: SeatKey,
    pub price: f64,
    pub status: SeatStatus,
    pub geometry: Geometry,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RowLayout {
    pub row_number: String,
    pub seats: Vec<SeatKey>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SectionLayout {
    pub section_id: String,
    pub rows: Vec<RowLayout>,
}

/// Результат применения патча.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchOutcome {
    /// Статус изменился.
    Applied { previous: SeatStatus },
    /// Место уже было в этом статусе.
    Unchanged,
    /// Такого места в снимке нет.
    UnknownSeat,
}

impl PatchOutcome {
    pub fn changed(&self) -> bool {
        matches!(self, PatchOutcome::Applied { .. })
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SeatStore {
    venue_name: String,
    seats: HashMap<SeatKey, SeatRecord>,
    sections: Vec<SectionLayout>,
    non_seats: Vec<NonSeatArea>,
}

impl SeatStore {
    pub fn from_venue(venue: Venue) -> Self {
        let mut seats = HashMap::with_capacity(venue.seat_count());
        let mut sections = Vec::with_capacity(venue.sections.len());

        for section in venue.sections {
            let mut rows = Vec::with_capacity(section.rows.len());
            for row in section.rows {
                let mut keys = Vec::with_capacity(row.seats.len());
                for seat in row.seats {
                    let key = SeatKey::new(&section.section_id, &row.row_number, seat.seat_number);
                    keys.push(key.clone());
                    seats.insert(
                        key.clone(),
                        SeatRecord {
                            key,
                            price: seat.price,
                            status: seat.status,
                            geometry: seat.geometry,
                        },
                    );
                }
                rows.push(RowLayout {
                    row_number: row.row_number,
                    seats: keys,
                });
            }
            sections.push(SectionLayout {
                section_id: section.section_id,
                rows,
            });
        }

        Self {
            venue_name: venue.name,
            seats,
            sections,
            non_seats: venue.non_seats,
        }
    }

    /// Применяет изменение статуса. Повторное применение того же патча ничего не меняет.
    pub fn apply_patch(&mut self, patch: &SeatPatch) -> PatchOutcome {
        let key = patch.key();
        let Some(record) = self.seats.get_mut(&key) else {
            debug!("Patch for unknown seat {} ignored", key);
            return PatchOutcome::UnknownSeat;
        };

        if record.status == patch.status {
            return PatchOutcome::Unchanged;
        }

        let previous = record.status;
        record.status = patch.status;
        debug!("Seat {} status {:?} -> {:?}", key, previous, patch.status);
        PatchOutcome::Applied { previous }
    }

    pub fn venue_name(&self) -> &str {
        &self.venue_name
    }

    pub fn get(&self, key: &SeatKey) -> Option<&SeatRecord> {
        self.seats.get(key)
    }

    pub fn status(&self, key: &SeatKey) -> Option<SeatStatus> {
        self.seats.get(key).map(|r| r.status)
    }

    pub fn sections(&self) -> &[SectionLayout] {
        &self.sections
    }

    pub fn non_seats(&self) -> &[NonSeatArea] {
        &self.non_seats
    }

    pub fn len(&self) -> usize {
        self.seats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seats.is_empty()
    }

    /// Все места в порядке снимка: секция, ряд, место.
    pub fn iter_ordered(&self) -> impl Iterator<Item = &SeatRecord> + '_ {
        self.sections
            .iter()
            .flat_map(|s| s.rows.iter())
            .flat_map(|r| r.seats.iter())
            .filter_map(|k| self.seats.get(k))
    }

    pub fn count_with_status(&self, status: SeatStatus) -> usize {
        self.seats.values().filter(|r| r.status == status).count()
    }

    /// Размер холста: крайние точки мест и зон, не меньше окна.
    /// По высоте добавлен запас под панель кнопок.
    pub fn content_size(&self, window_width: f64, window_height: f64) -> (f64, f64) {
        const ACTION_BAR_PADDING: f64 = 70.0;

        let geometries = self
            .seats
            .values()
            .map(|r| &r.geometry)
            .chain(self.non_seats.iter().map(|n| &n.geometry));

        let (width, height) = geometries.fold((window_width, window_height), |(w, h), g| {
            (w.max(g.right()), h.max(g.bottom()))
        });
        (width, height + ACTION_BAR_PADDING)
    }
}
