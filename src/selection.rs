use std::collections::HashSet;

use crate::models::{SeatKey, SeatStatus};

/// Набор мест, которые пользователь собирается купить.
///
/// Чистая логика без I/O. Порядок добавления сохраняется - в этом же
/// порядке места уходят в запрос покупки.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionSet {
    order: Vec<SeatKey>,
    members: HashSet<SeatKey>,
}

impl SelectionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Переключает место. Занятое место никогда не выбирается, даже если
    /// вызывающий код забыл это проверить. Возвращает `true`, если набор изменился.
    pub fn toggle(&mut self, key: &SeatKey, current_status: SeatStatus) -> bool {
        if current_status.is_booked() {
            return false;
        }

        if self.members.remove(key) {
            self.order.retain(|k| k != key);
        } else {
            self.members.insert(key.clone());
            self.order.push(key.clone());
        }
        true
    }

    pub fn remove(&mut self, key: &SeatKey) -> bool {
        if self.members.remove(key) {
            self.order.retain(|k| k != key);
            true
        } else {
            false
        }
    }

    pub fn clear(&mut self) {
        self.order.clear();
        self.members.clear();
    }

    pub fn contains(&self, key: &SeatKey) -> bool {
        self.members.contains(key)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SeatKey> + '_ {
        self.order.iter()
    }
}
