use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

/// A sellable service. Prices are whole currency units.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Service {
    pub id: String,
    pub name: String,
    pub price: u32,
}

impl Service {
    pub fn new(id: impl Into<String>, name: impl Into<String>, price: u32) -> Self {
        Self { id: id.into(), name: name.into(), price }
    }
}

/// Ordered, immutable list of supported services.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Catalog {
    services: Vec<Service>,
}

const BUILTIN: &[(&str, &str, u32)] = &[
    ("netflix", "Netflix", 150),
    ("spotify", "Spotify Premium", 400),
    ("primevideo", "Prime Video", 100),
    ("showmax_1m", "Showmax Pro (1 Month)", 100),
    ("showmax_3m", "Showmax Pro (3 Months)", 250),
    ("showmax_6m", "Showmax Pro (6 Months)", 500),
    ("showmax_1y", "Showmax Pro (1 Year)", 900),
    ("youtubepremium", "YouTube Premium", 100),
    ("applemusic", "Apple Music", 250),
    ("canva", "Canva Pro", 300),
    ("grammarly", "Grammarly Premium", 250),
    ("urbanvpn", "Urban VPN", 100),
    ("nordvpn", "NordVPN", 350),
    ("xbox", "Xbox Game Pass", 400),
    ("playstation", "PlayStation Plus", 400),
    ("deezer", "Deezer Premium", 200),
    ("tidal", "Tidal HiFi", 250),
    ("soundcloud", "SoundCloud Go+", 150),
    ("audible", "Audible Premium Plus", 400),
    ("skillshare", "Skillshare Premium", 350),
    ("masterclass", "MasterClass", 600),
    ("duolingo", "Duolingo Super", 150),
    ("notion", "Notion Plus", 200),
    ("microsoft365", "Microsoft 365", 500),
    ("googleone", "Google One", 250),
    ("adobecc", "Adobe Creative Cloud", 700),
    ("expressvpn", "ExpressVPN", 400),
    ("surfshark", "Surfshark VPN", 200),
    ("cyberghost", "CyberGhost VPN", 250),
    ("ipvanish", "IPVanish", 200),
    ("protonvpn", "ProtonVPN Plus", 300),
    ("windscribe", "Windscribe Pro", 150),
    ("eaplay", "EA Play", 250),
    ("ubisoft", "Ubisoft+", 300),
    ("geforcenow", "Nvidia GeForce Now", 350),
    ("peacock_tv", "Peacock TV", 50),
];

static BUILTIN_CATALOG: Lazy<Catalog> = Lazy::new(|| {
    Catalog::new(BUILTIN.iter().map(|(id, name, price)| Service::new(*id, *name, *price)))
});

impl Catalog {
    /// Build a catalog; later duplicates of an id are dropped.
    pub fn new(services: impl IntoIterator<Item = Service>) -> Self {
        let mut out: Vec<Service> = Vec::new();
        for s in services {
            if !out.iter().any(|e| e.id == s.id) {
                out.push(s);
            }
        }
        Self { services: out }
    }

    /// The catalog compiled into the binary.
    pub fn builtin() -> &'static Catalog {
        &BUILTIN_CATALOG
    }

    pub fn services(&self) -> &[Service] {
        &self.services
    }

    pub fn get(&self, id: &str) -> Option<&Service> {
        self.services.iter().find(|s| s.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    /// Display name for a service id, falling back to the id itself.
    pub fn display_name<'a>(&'a self, id: &'a str) -> &'a str {
        self.get(id).map(|s| s.name.as_str()).unwrap_or(id)
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }
}
