//! Fixed vocabularies of the game.

pub const MAIN_STATS: [&str; 17] = [
	"SPD",
	"HP",
	"ATK",
	"DEF",
	"Break Effect",
	"Effect Hit Rate",
	"Energy Regeneration Rate",
	"Outgoing Healing Boost",
	"Physical DMG Boost",
	"Fire DMG Boost",
	"Ice DMG Boost",
	"Wind DMG Boost",
	"Lightning DMG Boost",
	"Quantum DMG Boost",
	"Imaginary DMG Boost",
	"CRIT Rate",
	"CRIT DMG",
];

pub const SUB_STATS: [&str; 9] = [
	"SPD",
	"ATK",
	"DEF",
	"HP",
	"Effect Hit Rate",
	"Effect RES",
	"CRIT Rate",
	"CRIT DMG",
	"Break Effect",
];

pub const PATHS: [&str; 8] = [
	"The Hunt",
	"Erudition",
	"Harmony",
	"Preservation",
	"Destruction",
	"Nihility",
	"Abundance",
	"Remembrance",
];

/// Reference colors of the rarity bar, where index + 1 is the rarity.
pub const RARITY_COLORS: [[u8; 3]; 5] = [
	[94, 97, 111],   // gray
	[74, 100, 121],  // green
	[61, 90, 145],   // blue
	[101, 92, 142],  // purple
	[158, 109, 95],  // gold
];

/// Suffix marking a percentage-scaled substat (`ATK_` vs flat `ATK`).
pub const PERCENT_SUFFIX: char = '_';

/// Canonical in-game substat order.
pub const SUBSTAT_ORDER: [&str; 12] = [
	"HP",
	"ATK",
	"DEF",
	"HP_",
	"ATK_",
	"DEF_",
	"SPD",
	"CRIT Rate_",
	"CRIT DMG_",
	"Effect Hit Rate_",
	"Effect RES_",
	"Break Effect_",
];
