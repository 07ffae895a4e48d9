//! Category set of the deployed bird classifier.

/// Species names in the order of the model output vector.
pub const BIRD_SPECIES: &[&str] = &[
    "ALBATROSS",
    "ALEXANDRINE PARAKEET",
    "AMERICAN GOLDFINCH",
    "AMERICAN KESTREL",
    "AMERICAN REDSTART",
    "ANNAS HUMMINGBIRD",
    "BALD EAGLE",
    "BALTIMORE ORIOLE",
    "BANANAQUIT",
    "BAR-TAILED GODWIT",
    "BARN OWL",
    "BARN SWALLOW",
    "BAY-BREASTED WARBLER",
    "BELTED KINGFISHER",
    "BIRD OF PARADISE",
    "BLACK SKIMMER",
    "BLACK-CAPPED CHICKADEE",
    "BLACK-NECKED GREBE",
    "BLACKBURNIAM WARBLER",
    "BLUE HERON",
    "BOBOLINK",
    "BROWN THRASHER",
    "CACTUS WREN",
    "CALIFORNIA CONDOR",
    "CALIFORNIA GULL",
    "CALIFORNIA QUAIL",
    "CAPE MAY WARBLER",
    "CHARA DE COLLAR",
    "CHIPPING SPARROW",
    "CINNAMON TEAL",
    "COCK OF THE  ROCK",
    "COCKATOO",
    "COMMON LOON",
    "COUCHS KINGBIRD",
    "CRESTED AUKLET",
    "CRESTED CARACARA",
    "CROW",
    "CROWNED PIGEON",
    "CURL CRESTED ARACURI",
    "DARK EYED JUNCO",
    "DOWNY WOODPECKER",
    "EASTERN BLUEBIRD",
    "EASTERN ROSELLA",
    "EASTERN TOWEE",
    "ELEGANT TROGON",
    "EMPEROR PENGUIN",
    "EVENING GROSBEAK",
    "FLAME TANAGER",
    "FLAMINGO",
    "FRIGATE",
    "GOLD WING WARBLER",
    "GOLDEN CHLOROPHONIA",
    "GOLDEN EAGLE",
    "GOLDEN PHEASANT",
    "GOULDIAN FINCH",
    "GRAY CATBIRD",
    "GREY PLOVER",
    "HAWAIIAN GOOSE",
    "HOODED MERGANSER",
    "HOOPOES",
    "HOUSE FINCH",
    "HOUSE SPARROW",
    "HYACINTH MACAW",
    "INDIGO BUNTING",
    "LARK BUNTING",
    "LILAC ROLLER",
    "LONG-EARED OWL",
    "MALLARD DUCK",
    "MANDRIN DUCK",
    "MARABOU STORK",
    "MOURNING DOVE",
    "MYNA",
    "NICOBAR PIGEON",
    "NORTHERN CARDINAL",
    "NORTHERN FLICKER",
    "NORTHERN GOSHAWK",
    "NORTHERN MOCKINGBIRD",
    "OSTRICH",
    "PAINTED BUNTIG",
    "PARADISE TANAGER",
    "PARUS MAJOR",
    "PEACOCK",
    "PELICAN",
    "PEREGRINE FALCON",
    "PINK ROBIN",
    "PUFFIN",
    "PURPLE FINCH",
    "PURPLE GALLINULE",
    "PURPLE MARTIN",
    "QUETZAL",
    "RAINBOW LORIKEET",
    "RED FACED CORMORANT",
    "RED HEADED WOODPECKER",
    "RED THROATED BEE EATER",
    "RED WINGED BLACKBIRD",
    "RED WISKERED BULBUL",
    "RING-NECKED PHEASANT",
    "ROADRUNNER",
    "ROBIN",
    "ROUGH LEG BUZZARD",
    "RUBY THROATED HUMMINGBIRD",
    "SAND MARTIN",
    "SCARLET IBIS",
    "SCARLET MACAW",
    "SNOWY EGRET",
    "SPLENDID WREN",
    "STORK BILLED KINGFISHER",
    "STRAWBERRY FINCH",
    "TEAL DUCK",
    "TIT MOUSE",
    "TOUCHAN",
    "TRUMPTER SWAN",
    "TURKEY VULTURE",
    "TURQUOISE MOTMOT",
    "VENEZUELIAN TROUPIAL",
    "VERMILION FLYCATHER",
    "WESTERN MEADOWLARK",
    "WILSONS BIRD OF PARADISE",
    "WOOD DUCK",
    "YELLOW HEADED BLACKBIRD",
];
