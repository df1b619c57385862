//! Property-based tests for server parsing and launch validation.

use proptest::prelude::*;

use crate::harness::{ok_document, server_info_xml};
use crate::pairing::Pin;
use crate::server::{parse_major_version, DisplayMode, ServerDescriptor};
use crate::session::{validate_mode, StreamLaunchRequest};
use crate::xml::XmlResponse;

fn descriptor(modes: Vec<DisplayMode>) -> ServerDescriptor {
    ServerDescriptor {
        address: "host".into(),
        paired: true,
        current_game: 0,
        supports_4k: false,
        unsupported: false,
        server_major_version: 7,
        app_version: "7.1".into(),
        gfe_version: None,
        gpu_type: None,
        gs_version: None,
        display_modes: modes,
    }
}

proptest! {
    #[test]
    fn prop_major_version_is_leading_integer(major in 0u32..100_000, rest in "(\\.[0-9]{1,4}){0,3}") {
        prop_assert_eq!(parse_major_version(&format!("{major}{rest}")), major);
    }

    #[test]
    fn prop_idle_host_never_reports_a_game(game in 1u32..u32::MAX) {
        let xml = ok_document(&server_info_xml("7.1", true, game, false, &[]));
        let info = XmlResponse::parse(xml.as_bytes()).unwrap();
        let server = ServerDescriptor::from_server_info("h", &info, false).unwrap();
        prop_assert_eq!(server.current_game, 0);
    }

    #[test]
    fn prop_listed_mode_is_accepted(
        modes in prop::collection::vec((320u32..2160, 240u32..2160, 24u32..=144), 1..8),
        pick in any::<prop::sample::Index>(),
        sops in any::<bool>(),
    ) {
        let display_modes: Vec<DisplayMode> = modes
            .iter()
            .map(|&(width, height, refresh)| DisplayMode { width, height, refresh })
            .collect();
        let chosen = display_modes[pick.index(display_modes.len())];
        let request = StreamLaunchRequest {
            width: chosen.width,
            height: chosen.height,
            fps: chosen.refresh,
            sops,
            ..Default::default()
        };
        prop_assert!(validate_mode(&descriptor(display_modes), &request).is_ok());
    }

    #[test]
    fn prop_pin_accepts_exactly_four_digits(s in "[0-9]{0,8}") {
        prop_assert_eq!(Pin::new(&s).is_ok(), s.len() == 4);
    }
}
