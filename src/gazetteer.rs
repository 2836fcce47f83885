//! Bundled list of known cities used by the location resolver

use crate::models::Coordinates;

/// A city the resolver knows without any network lookup
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GazetteerEntry {
    pub name: &'static str,
    /// ISO 3166-1 alpha-2 country code
    pub country: &'static str,
    pub latitude: f64,
    pub longitude: f64,
    /// IATA city code, used by the hotel provider
    pub code: Option<&'static str>,
}

impl GazetteerEntry {
    #[must_use]
    pub fn coordinates(&self) -> Coordinates {
        Coordinates {
            latitude: self.latitude,
            longitude: self.longitude,
        }
    }
}

const fn entry(
    name: &'static str,
    country: &'static str,
    latitude: f64,
    longitude: f64,
    code: Option<&'static str>,
) -> GazetteerEntry {
    GazetteerEntry {
        name,
        country,
        latitude,
        longitude,
        code,
    }
}

/// Supported countries: (ISO code, English name)
pub const COUNTRIES: [(&str, &str); 3] = [("FR", "France"), ("IT", "Italy"), ("ES", "Spain")];

/// Map an ISO code or English country name to the ISO code
#[must_use]
pub fn country_code(country: &str) -> Option<&'static str> {
    let country = country.trim();
    COUNTRIES
        .iter()
        .find(|(code, name)| {
            code.eq_ignore_ascii_case(country) || name.eq_ignore_ascii_case(country)
        })
        .map(|(code, _)| *code)
}

pub static CITIES: &[GazetteerEntry] = &[
    entry("Paris", "FR", 48.8566, 2.3522, Some("PAR")),
    entry("Lyon", "FR", 45.7640, 4.8357, Some("LYS")),
    entry("Marseille", "FR", 43.2965, 5.3698, Some("MRS")),
    entry("Nice", "FR", 43.7102, 7.2620, Some("NCE")),
    entry("Toulouse", "FR", 43.6047, 1.4442, Some("TLS")),
    entry("Strasbourg", "FR", 48.5734, 7.7521, Some("XER")),
    entry("Bordeaux", "FR", 44.8378, -0.5792, Some("BOD")),
    entry("Nantes", "FR", 47.2184, -1.5536, None),
    entry("Lille", "FR", 50.6292, 3.0573, None),
    entry("Rennes", "FR", 48.1173, -1.6778, None),
    entry("Montpellier", "FR", 43.6109, 3.8763, None),
    entry("Saint-Étienne", "FR", 45.4397, 4.3872, None),
    entry("Le Havre", "FR", 49.4944, 0.1079, None),
    entry("Grenoble", "FR", 45.1885, 5.7245, None),
    entry("Dijon", "FR", 47.3220, 5.0415, None),
    entry("Angers", "FR", 47.4784, -0.5632, None),
    entry("Nîmes", "FR", 43.8367, 4.3601, None),
    entry("Villeurbanne", "FR", 45.7640, 4.8796, None),
    entry("Clermont-Ferrand", "FR", 45.7797, 3.0863, None),
    entry("Le Mans", "FR", 48.0077, 0.1996, None),
    entry("Aix-en-Provence", "FR", 43.5297, 5.4474, None),
    entry("Tours", "FR", 47.3941, 0.6848, None),
    entry("Limoges", "FR", 45.8336, 1.2611, None),
    entry("Orléans", "FR", 47.9029, 1.9039, None),
    entry("Mulhouse", "FR", 47.7508, 7.3359, None),
    entry("Caen", "FR", 49.1829, -0.3707, None),
    entry("Brest", "FR", 48.3905, -4.4860, None),
    entry("Reims", "FR", 49.2583, 4.0317, None),
    entry("Nancy", "FR", 48.6921, 6.1844, None),
    entry("Avignon", "FR", 43.9509, 4.8059, None),
    entry("Rome", "IT", 41.9028, 12.4964, Some("ROM")),
    entry("Milan", "IT", 45.4642, 9.1900, Some("MIL")),
    entry("Naples", "IT", 40.8518, 14.2681, Some("NAP")),
    entry("Turin", "IT", 45.0703, 7.6869, Some("TRN")),
    entry("Florence", "IT", 43.7696, 11.2558, Some("FLR")),
    entry("Venice", "IT", 45.4408, 12.3155, Some("VCE")),
    entry("Bologna", "IT", 44.4949, 11.3426, Some("BLQ")),
    entry("Genoa", "IT", 44.4056, 8.9463, Some("GOA")),
    entry("Palermo", "IT", 38.1157, 13.3615, None),
    entry("Bari", "IT", 41.1171, 16.8719, None),
    entry("Catania", "IT", 37.5079, 15.0830, None),
    entry("Verona", "IT", 45.4384, 10.9916, None),
    entry("Messina", "IT", 38.1938, 15.5540, None),
    entry("Padua", "IT", 45.4064, 11.8768, None),
    entry("Trieste", "IT", 45.6495, 13.7768, None),
    entry("Taranto", "IT", 40.4668, 17.2725, None),
    entry("Brescia", "IT", 45.5416, 10.2118, None),
    entry("Reggio Calabria", "IT", 38.1113, 15.6619, None),
    entry("Modena", "IT", 44.6472, 10.9250, None),
    entry("Prato", "IT", 43.8777, 11.1025, None),
    entry("Parma", "IT", 44.8015, 10.3279, None),
    entry("Reggio Emilia", "IT", 44.6966, 10.6309, None),
    entry("Perugia", "IT", 43.1122, 12.3888, None),
    entry("Livorno", "IT", 43.5482, 10.3116, None),
    entry("Ravenna", "IT", 44.4184, 12.2035, None),
    entry("Cagliari", "IT", 39.2238, 9.1217, None),
    entry("Foggia", "IT", 41.4621, 15.5444, None),
    entry("Rimini", "IT", 44.0678, 12.5695, None),
    entry("Salerno", "IT", 40.6824, 14.7681, None),
    entry("Ferrara", "IT", 44.8381, 11.6198, None),
    entry("Sassari", "IT", 40.7259, 8.5590, None),
    entry("Latina", "IT", 41.4677, 12.9037, None),
    entry("Giugliano in Campania", "IT", 40.9287, 14.2056, None),
    entry("Monza", "IT", 45.5845, 9.2744, None),
    entry("Syracuse", "IT", 37.0755, 15.2866, None),
    entry("Madrid", "ES", 40.4168, -3.7038, Some("MAD")),
    entry("Barcelona", "ES", 41.3851, 2.1734, Some("BCN")),
    entry("Valencia", "ES", 39.4699, -0.3763, Some("VLC")),
    entry("Seville", "ES", 37.3891, -5.9845, Some("SVQ")),
    entry("Zaragoza", "ES", 41.6488, -0.8891, None),
    entry("Málaga", "ES", 36.7213, -4.4214, Some("AGP")),
    entry("Murcia", "ES", 37.9922, -1.1307, None),
    entry("Palma", "ES", 39.5696, 2.6502, Some("PMI")),
    entry("Bilbao", "ES", 43.2627, -2.9253, Some("BIO")),
    entry("Alicante", "ES", 38.3452, -0.4810, None),
    entry("Las Palmas", "ES", 28.1248, -15.4300, None),
    entry("Córdoba", "ES", 37.8882, -4.7794, None),
    entry("Valladolid", "ES", 41.6523, -4.7245, None),
    entry("Vigo", "ES", 42.2406, -8.7207, None),
    entry("Gijón", "ES", 43.5322, -5.6611, None),
    entry("Hospitalet de Llobregat", "ES", 41.3598, 2.1074, None),
    entry("A Coruña", "ES", 43.3623, -8.4115, None),
    entry("Granada", "ES", 37.1773, -3.5986, None),
    entry("Vitoria-Gasteiz", "ES", 42.8467, -2.6716, None),
    entry("Elche", "ES", 38.2622, -0.7016, None),
    entry("Santa Cruz de Tenerife", "ES", 28.4636, -16.2518, None),
    entry("Oviedo", "ES", 43.3614, -5.8593, None),
    entry("Badalona", "ES", 41.4502, 2.2445, None),
    entry("Cartagena", "ES", 37.6063, -0.9864, None),
    entry("Móstoles", "ES", 40.3232, -3.8644, None),
    entry("Jerez de la Frontera", "ES", 36.6868, -6.1362, None),
    entry("Tarrasa", "ES", 41.5633, 2.0086, None),
    entry("Sabadell", "ES", 41.5431, 2.1095, None),
    entry("Alcalá de Henares", "ES", 40.4817, -3.3649, None),
    entry("Pamplona", "ES", 42.8125, -1.6458, None),
    entry("Fuenlabrada", "ES", 40.2842, -3.7947, None),
    entry("Almería", "ES", 36.8381, -2.4597, None),
    entry("San Sebastián", "ES", 43.3183, -1.9812, None),
    entry("Burgos", "ES", 42.3440, -3.6969, None),
    entry("Albacete", "ES", 38.9942, -1.8564, None),
    entry("Santander", "ES", 43.4623, -3.8099, None),
    entry("Castellón de la Plana", "ES", 39.9864, -0.0513, None),
    entry("Alcorcón", "ES", 40.3459, -3.8248, None),
    entry("Getafe", "ES", 40.3057, -3.7327, None),
    entry("Salamanca", "ES", 40.9701, -5.6635, None),
];

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_country_code_lookup() {
        assert_eq!(country_code("fr"), Some("FR"));
        assert_eq!(country_code("Italy"), Some("IT"));
        assert_eq!(country_code(" SPAIN "), Some("ES"));
        assert_eq!(country_code("DE"), None);
    }

    #[test]
    fn test_entries_are_valid() {
        for city in CITIES {
            assert!((-90.0..=90.0).contains(&city.latitude), "{}", city.name);
            assert!((-180.0..=180.0).contains(&city.longitude), "{}", city.name);
            assert!(country_code(city.country).is_some(), "{}", city.name);
        }
    }

    #[test]
    fn test_names_unique_per_country() {
        let mut seen = HashSet::new();
        for city in CITIES {
            assert!(seen.insert((city.country, city.name)), "duplicate {}", city.name);
        }
    }
}
