use serde::{Deserialize, Serialize};

pub const FALLBACK_ROOM_LABEL: &str = "selected room";

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RequiredPurchase {
    pub description: String,
    pub amount: i64,
}

/// A bookable room type. Money is in minor currency units.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RoomType {
    pub id: String,
    pub display_label: String,
    pub inventory_count: u32,
    pub min_party_size: u32,
    pub max_party_size: u32,
    pub included_guest_count: u32,
    pub hourly_rate: i64,
    pub extra_guest_rate: i64,
    #[serde(default)]
    pub required_purchase: Option<RequiredPurchase>,
}

#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PriceQuote {
    pub base_cost: i64,
    pub extra_guest_cost: i64,
    pub required_purchase_cost: i64,
    pub total: i64,
}

impl RoomType {
    /// Stand-in for ids missing from the registry: one unit, no pricing.
    pub fn fallback(id: &str) -> Self {
        Self {
            id: id.to_string(),
            display_label: FALLBACK_ROOM_LABEL.to_string(),
            inventory_count: 1,
            min_party_size: 1,
            max_party_size: 1,
            included_guest_count: 1,
            hourly_rate: 0,
            extra_guest_rate: 0,
            required_purchase: None,
        }
    }

    pub fn accepts_party(&self, party_size: u32) -> bool {
        (self.min_party_size..=self.max_party_size).contains(&party_size)
    }

    pub fn quote(&self, party_size: u32, duration_hours: u32) -> PriceQuote {
        let hours = i64::from(duration_hours);
        let extra_guests = i64::from(party_size.saturating_sub(self.included_guest_count));
        let base_cost = self.hourly_rate * hours;
        let extra_guest_cost = extra_guests * self.extra_guest_rate * hours;
        let required_purchase_cost = self.required_purchase.as_ref().map_or(0, |p| p.amount);

        PriceQuote {
            base_cost,
            extra_guest_cost,
            required_purchase_cost,
            total: base_cost + extra_guest_cost + required_purchase_cost,
        }
    }

    /// User-facing "sold out" message; single-unit rooms are never pluralized.
    pub fn unavailable_message(&self) -> String {
        if self.inventory_count <= 1 {
            format!("The {} is already booked for that time. Please choose another time.", self.display_label)
        } else {
            format!(
                "All {} {} rooms are booked for that time. Please choose another time.",
                self.inventory_count, self.display_label
            )
        }
    }
}

/// Static room table. Lookups never fail; unknown ids get [`RoomType::fallback`].
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(transparent)]
pub struct RoomRegistry {
    rooms: Vec<RoomType>,
}

impl RoomRegistry {
    pub fn new(rooms: Vec<RoomType>) -> Self {
        Self { rooms }
    }

    pub fn get(&self, room_id: &str) -> RoomType {
        self.find(room_id).cloned().unwrap_or_else(|| RoomType::fallback(room_id))
    }

    pub fn find(&self, room_id: &str) -> Option<&RoomType> {
        self.rooms.iter().find(|r| r.id == room_id)
    }

    pub fn all(&self) -> &[RoomType] {
        &self.rooms
    }
}

impl Default for RoomRegistry {
    fn default() -> Self {
        let room = |id: &str, label: &str, inventory, min, max, included, hourly| RoomType {
            id: id.to_string(),
            display_label: label.to_string(),
            inventory_count: inventory,
            min_party_size: min,
            max_party_size: max,
            included_guest_count: included,
            hourly_rate: hourly,
            extra_guest_rate: 500,
            required_purchase: None,
        };

        let mut party = room("party", "Party room", 1, 12, 30, 15, 15000);
        party.required_purchase = Some(RequiredPurchase {
            description: "Party platter".to_string(),
            amount: 12000,
        });

        Self::new(vec![
            room("small", "Small", 4, 1, 6, 4, 4000),
            room("medium", "Medium", 3, 4, 10, 6, 6000),
            room("large", "Large", 2, 8, 16, 10, 9000),
            party,
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_room_falls_back_to_single_unit() {
        let registry = RoomRegistry::default();
        let room = registry.get("vip-lounge");
        assert_eq!(room.inventory_count, 1);
        assert_eq!(room.display_label, FALLBACK_ROOM_LABEL);
        assert!(registry.find("vip-lounge").is_none());
    }

    #[test]
    fn test_quote_charges_extra_guests_per_hour() {
        let registry = RoomRegistry::default();
        let medium = registry.get("medium");
        let quote = medium.quote(8, 2);
        assert_eq!(quote.base_cost, 12000);
        assert_eq!(quote.extra_guest_cost, 2 * 500 * 2);
        assert_eq!(quote.total, 14000);

        let party = registry.get("party").quote(12, 1);
        assert_eq!(party.required_purchase_cost, 12000);
        assert_eq!(party.total, 27000);
    }

    #[test]
    fn test_unavailable_message_pluralization() {
        let registry = RoomRegistry::default();
        assert!(registry.get("small").unavailable_message().contains("All 4 Small rooms"));
        let single = registry.get("party").unavailable_message();
        assert!(!single.contains("rooms"));
        assert!(RoomType::fallback("x").unavailable_message().contains("The selected room is"));
    }

    #[test]
    fn test_party_bounds() {
        let small = RoomRegistry::default().get("small");
        assert!(small.accepts_party(1));
        assert!(small.accepts_party(6));
        assert!(!small.accepts_party(7));
        assert!(!small.accepts_party(0));
    }
}
