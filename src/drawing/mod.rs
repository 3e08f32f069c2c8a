mod overlay;

pub use overlay::draw_cards;
