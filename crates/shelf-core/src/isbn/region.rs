//! # Region Table
//!
//! Maps a registration group value to the region that assigned it.
//!
//! The table is an ordered list of (group values, region) pairs evaluated
//! top to bottom; the first match wins. Several groups can map to the same
//! region (Mexico owns 607, 968 and 970). Values inside the group bands that
//! are not listed (610, 9969, 99902, 99907) are unassigned.

use serde::{Deserialize, Serialize};
use std::fmt;

// =============================================================================
// Region Enumeration
// =============================================================================

/// Declares the closed [`Region`] enumeration together with display names.
macro_rules! define_regions {
    ($($variant:ident => $name:literal,)+) => {
        /// Language area or country encoded by a registration group.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum Region {
            $($variant,)+
        }

        impl Region {
            /// Human-readable region name.
            pub const fn name(&self) -> &'static str {
                match self {
                    $(Region::$variant => $name,)+
                }
            }
        }
    };
}

define_regions! {
    EnglishSpeaking => "English-speaking area",
    FrenchSpeaking => "French-speaking area",
    GermanSpeaking => "German-speaking area",
    Japan => "Japan",
    RussianFederation => "Russian Federation and former USSR",
    China => "China",
    CzechiaSlovakia => "Czech Republic and Slovakia",
    India => "India",
    Norway => "Norway",
    Poland => "Poland",
    Spain => "Spain",
    Brazil => "Brazil",
    FormerYugoslavia => "Former Yugoslavia",
    Denmark => "Denmark",
    Italy => "Italy",
    SouthKorea => "Republic of Korea",
    Netherlands => "Netherlands and Flemish Belgium",
    Sweden => "Sweden",
    International => "International NGO publishers",
    Iran => "Iran",
    Kazakhstan => "Kazakhstan",
    Indonesia => "Indonesia",
    SaudiArabia => "Saudi Arabia",
    Vietnam => "Vietnam",
    Turkey => "Turkey",
    Romania => "Romania",
    Mexico => "Mexico",
    NorthMacedonia => "North Macedonia",
    Lithuania => "Lithuania",
    Thailand => "Thailand",
    Peru => "Peru",
    Mauritius => "Mauritius",
    Lebanon => "Lebanon",
    Hungary => "Hungary",
    Ukraine => "Ukraine",
    Greece => "Greece",
    Bulgaria => "Bulgaria",
    Philippines => "Philippines",
    Argentina => "Argentina",
    Finland => "Finland",
    Croatia => "Croatia",
    SriLanka => "Sri Lanka",
    Chile => "Chile",
    Taiwan => "Taiwan",
    Colombia => "Colombia",
    Cuba => "Cuba",
    Slovenia => "Slovenia",
    HongKong => "Hong Kong",
    Israel => "Israel",
    Malaysia => "Malaysia",
    Pakistan => "Pakistan",
    Portugal => "Portugal",
    Caribbean => "Caribbean Community",
    Egypt => "Egypt",
    Nigeria => "Nigeria",
    Venezuela => "Venezuela",
    Singapore => "Singapore",
    SouthPacific => "South Pacific",
    Bangladesh => "Bangladesh",
    Belarus => "Belarus",
    BosniaHerzegovina => "Bosnia and Herzegovina",
    Qatar => "Qatar",
    Albania => "Albania",
    Guatemala => "Guatemala",
    CostaRica => "Costa Rica",
    Algeria => "Algeria",
    Laos => "Laos",
    Syria => "Syria",
    Latvia => "Latvia",
    Iceland => "Iceland",
    Afghanistan => "Afghanistan",
    Nepal => "Nepal",
    Tunisia => "Tunisia",
    Armenia => "Armenia",
    Montenegro => "Montenegro",
    Georgia => "Georgia",
    Ecuador => "Ecuador",
    Uzbekistan => "Uzbekistan",
    DominicanRepublic => "Dominican Republic",
    NorthKorea => "Democratic People's Republic of Korea",
    UnitedArabEmirates => "United Arab Emirates",
    Estonia => "Estonia",
    Palestine => "Palestine",
    Kosovo => "Kosovo",
    Azerbaijan => "Azerbaijan",
    Morocco => "Morocco",
    Cameroon => "Cameroon",
    Jordan => "Jordan",
    Libya => "Libya",
    Panama => "Panama",
    Cyprus => "Cyprus",
    Ghana => "Ghana",
    Kenya => "Kenya",
    Kyrgyzstan => "Kyrgyzstan",
    Uganda => "Uganda",
    Uruguay => "Uruguay",
    Moldova => "Moldova",
    Tanzania => "Tanzania",
    PapuaNewGuinea => "Papua New Guinea",
    Zambia => "Zambia",
    Gambia => "Gambia",
    Bahrain => "Bahrain",
    Curacao => "Curaçao",
    Bolivia => "Bolivia",
    Kuwait => "Kuwait",
    Malawi => "Malawi",
    Malta => "Malta",
    SierraLeone => "Sierra Leone",
    Lesotho => "Lesotho",
    Botswana => "Botswana",
    Andorra => "Andorra",
    Suriname => "Suriname",
    Maldives => "Maldives",
    Namibia => "Namibia",
    Brunei => "Brunei Darussalam",
    FaroeIslands => "Faroe Islands",
    Benin => "Benin",
    ElSalvador => "El Salvador",
    Nicaragua => "Nicaragua",
    Paraguay => "Paraguay",
    Honduras => "Honduras",
    Mongolia => "Mongolia",
    Seychelles => "Seychelles",
    Haiti => "Haiti",
    Bhutan => "Bhutan",
    Macau => "Macau",
    RepublikaSrpska => "Republika Srpska",
    Sudan => "Sudan",
    Ethiopia => "Ethiopia",
    Tajikistan => "Tajikistan",
    Eritrea => "Eritrea",
    Cambodia => "Cambodia",
    Congo => "Congo",
    Mali => "Mali",
    Luxembourg => "Luxembourg",
    Oman => "Oman",
    Myanmar => "Myanmar",
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// =============================================================================
// Group Table
// =============================================================================

/// The group values a table row covers.
#[derive(Debug, Clone, Copy)]
enum GroupMatch {
    Exact(u32),
    Range(u32, u32),
}

impl GroupMatch {
    fn contains(self, value: u32) -> bool {
        match self {
            GroupMatch::Exact(v) => v == value,
            GroupMatch::Range(lo, hi) => (lo..=hi).contains(&value),
        }
    }
}

use GroupMatch::{Exact, Range};
use Region::*;

static REGION_TABLE: &[(GroupMatch, Region)] = &[
    // 1-digit groups
    (Range(0, 1), EnglishSpeaking),
    (Exact(2), FrenchSpeaking),
    (Exact(3), GermanSpeaking),
    (Exact(4), Japan),
    (Exact(5), RussianFederation),
    (Exact(7), China),
    // 2-digit groups
    (Exact(80), CzechiaSlovakia),
    (Exact(81), India),
    (Exact(82), Norway),
    (Exact(83), Poland),
    (Exact(84), Spain),
    (Exact(85), Brazil),
    (Exact(86), FormerYugoslavia),
    (Exact(87), Denmark),
    (Exact(88), Italy),
    (Exact(89), SouthKorea),
    (Exact(90), Netherlands),
    (Exact(91), Sweden),
    (Exact(92), International),
    (Exact(93), India),
    (Exact(94), Netherlands),
    // 3-digit groups
    (Exact(600), Iran),
    (Exact(601), Kazakhstan),
    (Exact(602), Indonesia),
    (Exact(603), SaudiArabia),
    (Exact(604), Vietnam),
    (Exact(605), Turkey),
    (Exact(606), Romania),
    (Exact(607), Mexico),
    (Exact(608), NorthMacedonia),
    (Exact(609), Lithuania),
    (Exact(611), Thailand),
    (Exact(612), Peru),
    (Exact(613), Mauritius),
    (Exact(614), Lebanon),
    (Exact(615), Hungary),
    (Exact(616), Thailand),
    (Exact(617), Ukraine),
    (Exact(618), Greece),
    (Exact(619), Bulgaria),
    (Exact(620), Mauritius),
    (Exact(621), Philippines),
    (Exact(950), Argentina),
    (Exact(951), Finland),
    (Exact(952), Finland),
    (Exact(953), Croatia),
    (Exact(954), Bulgaria),
    (Exact(955), SriLanka),
    (Exact(956), Chile),
    (Exact(957), Taiwan),
    (Exact(958), Colombia),
    (Exact(959), Cuba),
    (Exact(960), Greece),
    (Exact(961), Slovenia),
    (Exact(962), HongKong),
    (Exact(963), Hungary),
    (Exact(964), Iran),
    (Exact(965), Israel),
    (Exact(966), Ukraine),
    (Exact(967), Malaysia),
    (Exact(968), Mexico),
    (Exact(969), Pakistan),
    (Exact(970), Mexico),
    (Exact(971), Philippines),
    (Exact(972), Portugal),
    (Exact(973), Romania),
    (Exact(974), Thailand),
    (Exact(975), Turkey),
    (Exact(976), Caribbean),
    (Exact(977), Egypt),
    (Exact(978), Nigeria),
    (Exact(979), Indonesia),
    (Exact(980), Venezuela),
    (Exact(981), Singapore),
    (Exact(982), SouthPacific),
    (Exact(983), Malaysia),
    (Exact(984), Bangladesh),
    (Exact(985), Belarus),
    (Exact(986), Taiwan),
    (Exact(987), Argentina),
    (Exact(988), HongKong),
    (Exact(989), Portugal),
    // 4-digit groups
    (Exact(9926), BosniaHerzegovina),
    (Exact(9927), Qatar),
    (Exact(9928), Albania),
    (Exact(9929), Guatemala),
    (Exact(9930), CostaRica),
    (Exact(9931), Algeria),
    (Exact(9932), Laos),
    (Exact(9933), Syria),
    (Exact(9934), Latvia),
    (Exact(9935), Iceland),
    (Exact(9936), Afghanistan),
    (Exact(9937), Nepal),
    (Exact(9938), Tunisia),
    (Exact(9939), Armenia),
    (Exact(9940), Montenegro),
    (Exact(9941), Georgia),
    (Exact(9942), Ecuador),
    (Exact(9943), Uzbekistan),
    (Exact(9944), Turkey),
    (Exact(9945), DominicanRepublic),
    (Exact(9946), NorthKorea),
    (Exact(9947), Algeria),
    (Exact(9948), UnitedArabEmirates),
    (Exact(9949), Estonia),
    (Exact(9950), Palestine),
    (Exact(9951), Kosovo),
    (Exact(9952), Azerbaijan),
    (Exact(9953), Lebanon),
    (Exact(9954), Morocco),
    (Exact(9955), Lithuania),
    (Exact(9956), Cameroon),
    (Exact(9957), Jordan),
    (Exact(9958), BosniaHerzegovina),
    (Exact(9959), Libya),
    (Exact(9960), SaudiArabia),
    (Exact(9961), Algeria),
    (Exact(9962), Panama),
    (Exact(9963), Cyprus),
    (Exact(9964), Ghana),
    (Exact(9965), Kazakhstan),
    (Exact(9966), Kenya),
    (Exact(9967), Kyrgyzstan),
    (Exact(9968), CostaRica),
    (Exact(9970), Uganda),
    (Exact(9971), Singapore),
    (Exact(9972), Peru),
    (Exact(9973), Tunisia),
    (Exact(9974), Uruguay),
    (Exact(9975), Moldova),
    (Exact(9976), Tanzania),
    (Exact(9977), CostaRica),
    (Exact(9978), Ecuador),
    (Exact(9979), Iceland),
    (Exact(9980), PapuaNewGuinea),
    (Exact(9981), Morocco),
    (Exact(9982), Zambia),
    (Exact(9983), Gambia),
    (Exact(9984), Latvia),
    (Exact(9985), Estonia),
    (Exact(9986), Lithuania),
    (Exact(9987), Tanzania),
    (Exact(9988), Ghana),
    (Exact(9989), NorthMacedonia),
    // 5-digit groups
    (Exact(99901), Bahrain),
    (Exact(99903), Mauritius),
    (Exact(99904), Curacao),
    (Exact(99905), Bolivia),
    (Exact(99906), Kuwait),
    (Exact(99908), Malawi),
    (Exact(99909), Malta),
    (Exact(99910), SierraLeone),
    (Exact(99911), Lesotho),
    (Exact(99912), Botswana),
    (Exact(99913), Andorra),
    (Exact(99914), Suriname),
    (Exact(99915), Maldives),
    (Exact(99916), Namibia),
    (Exact(99917), Brunei),
    (Exact(99918), FaroeIslands),
    (Exact(99919), Benin),
    (Exact(99920), Andorra),
    (Exact(99921), Qatar),
    (Exact(99922), Guatemala),
    (Exact(99923), ElSalvador),
    (Exact(99924), Nicaragua),
    (Exact(99925), Paraguay),
    (Exact(99926), Honduras),
    (Exact(99927), Albania),
    (Exact(99928), Georgia),
    (Exact(99929), Mongolia),
    (Exact(99930), Armenia),
    (Exact(99931), Seychelles),
    (Exact(99932), Malta),
    (Exact(99933), Nepal),
    (Exact(99934), DominicanRepublic),
    (Exact(99935), Haiti),
    (Exact(99936), Bhutan),
    (Exact(99937), Macau),
    (Exact(99938), RepublikaSrpska),
    (Exact(99939), Guatemala),
    (Exact(99940), Georgia),
    (Exact(99941), Armenia),
    (Exact(99942), Sudan),
    (Exact(99943), Albania),
    (Exact(99944), Ethiopia),
    (Exact(99945), Namibia),
    (Exact(99946), Nepal),
    (Exact(99947), Tajikistan),
    (Exact(99948), Eritrea),
    (Exact(99949), Mauritius),
    (Exact(99950), Cambodia),
    (Exact(99951), Congo),
    (Exact(99952), Mali),
    (Exact(99953), Paraguay),
    (Exact(99954), Bolivia),
    (Exact(99955), RepublikaSrpska),
    (Exact(99956), Albania),
    (Exact(99957), Malta),
    (Exact(99958), Bahrain),
    (Exact(99959), Luxembourg),
    (Exact(99960), Malawi),
    (Exact(99961), ElSalvador),
    (Exact(99962), Mongolia),
    (Exact(99963), Cambodia),
    (Exact(99964), Nicaragua),
    (Exact(99965), Macau),
    (Exact(99966), Kuwait),
    (Exact(99967), Paraguay),
    (Exact(99968), Botswana),
    (Exact(99969), Oman),
    (Exact(99970), Haiti),
    (Exact(99971), Myanmar),
    (Exact(99972), FaroeIslands),
    (Exact(99973), Mongolia),
    (Exact(99974), Bolivia),
    (Exact(99975), Tajikistan),
    (Exact(99976), RepublikaSrpska),
];

impl Region {
    /// Looks up the region for a registration group value.
    ///
    /// ## Example
    /// ```rust
    /// use shelf_core::isbn::Region;
    ///
    /// assert_eq!(Region::for_group(968), Some(Region::Mexico));
    /// assert_eq!(Region::for_group(610), None);
    /// ```
    pub fn for_group(value: u32) -> Option<Region> {
        REGION_TABLE
            .iter()
            .find(|(matcher, _)| matcher.contains(value))
            .map(|(_, region)| *region)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_digit_groups() {
        assert_eq!(Region::for_group(0), Some(EnglishSpeaking));
        assert_eq!(Region::for_group(1), Some(EnglishSpeaking));
        assert_eq!(Region::for_group(7), Some(China));
        assert_eq!(Region::for_group(6), None);
    }

    #[test]
    fn test_many_groups_one_region() {
        for group in [607, 968, 970] {
            assert_eq!(Region::for_group(group), Some(Mexico));
        }
    }

    #[test]
    fn test_band_boundaries() {
        assert_eq!(Region::for_group(94), Some(Netherlands));
        assert_eq!(Region::for_group(621), Some(Philippines));
        assert_eq!(Region::for_group(989), Some(Portugal));
        assert_eq!(Region::for_group(9926), Some(BosniaHerzegovina));
        assert_eq!(Region::for_group(9989), Some(NorthMacedonia));
        assert_eq!(Region::for_group(99976), Some(RepublikaSrpska));
        assert_eq!(Region::for_group(99977), None);
    }

    #[test]
    fn test_unassigned_groups() {
        for group in [610, 9969, 99902, 99907] {
            assert_eq!(Region::for_group(group), None);
        }
    }

    #[test]
    fn test_display_name() {
        assert_eq!(Region::SouthKorea.to_string(), "Republic of Korea");
    }
}
