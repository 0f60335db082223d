use superdst::{
    EncoderConfig, LcKind, OmKey, PulseFlags, PulseMap, RecoPulse, SuperDst, Version,
};

fn single(om: OmKey, pulse: RecoPulse) -> PulseMap {
    let mut map = PulseMap::new();
    map.insert(om, vec![pulse]);
    map
}

#[test]
fn in_ice_v1_layout() {
    let map = single(
        OmKey::new(1, 1),
        RecoPulse::new(0.0, 1.025, 8.0, PulseFlags::LC),
    );
    let dst = SuperDst::new(&map).unwrap();
    let bytes = dst.to_bytes().unwrap();
    assert_eq!(
        &bytes[..],
        [
            0x01, // version
            0x01, 0x00, 0xd4, // stamps: time 512 = slop 2 + 0, charge 20, HLC, stop
            0x01, 0x40, 0x40, // headers: dom id 64, slop 2
            0x00, // in-ice SLC widths
            0x01, 0x13, // in-ice HLC widths: one 8 ns width
            0x00, // surface SLC widths
            0x00, // surface HLC widths
            0x00, // extra bytes
        ]
    );

    let decoded = SuperDst::from_bytes(&bytes).unwrap();
    assert_eq!(decoded, dst);
    let p = decoded.unpack()[&OmKey::new(1, 1)][0];
    assert_eq!(p.time, 0.0);
    assert_eq!(p.width, 8.0);
    assert!((p.charge - 1.025).abs() < 1e-6);
    assert_eq!(p.flags, PulseFlags::ATWD | PulseFlags::FADC | PulseFlags::LC);
}

#[test]
fn in_ice_v0_layout() {
    let map = single(
        OmKey::new(1, 1),
        RecoPulse::new(0.0, 1.025, 8.0, PulseFlags::LC),
    );
    let config = EncoderConfig::new().with_version(Version::V0);
    let dst = SuperDst::with_config(&map, config).unwrap();
    let bytes = dst.to_bytes().unwrap();
    assert_eq!(&bytes[..], [0x00, 0x01, 0x80, 0xc7, 0x01, 0x40, 0x00]);

    let decoded = SuperDst::from_bytes(&bytes).unwrap();
    let p = decoded.unpack()[&OmKey::new(1, 1)][0];
    assert_eq!(p.time, 0.0);
    assert_eq!(p.width, 4.0);
    assert!((p.charge - 1.05).abs() < 1e-6);
}

#[test]
fn surface_v1_layout() {
    let map = single(
        OmKey::new(1, 61),
        RecoPulse::new(0.0, 1.0, 1.0, PulseFlags::FADC),
    );
    let dst = SuperDst::new(&map).unwrap();
    let bytes = dst.to_bytes().unwrap();
    assert_eq!(
        &bytes[..],
        [
            0x01, // version
            0x01, 0x00, 0xb9, // stamps: low charge bits 57, SLC, stop
            0x01, 0x7c, 0x40, // headers: dom id 124, slop 2
            0x00, 0x00, // in-ice widths
            0x01, 0x10, // surface SLC widths: one 1 ns width
            0x00, // surface HLC widths
            0x01, 0x38, // extra bytes: upper charge bits 56
        ]
    );

    let decoded = SuperDst::from_bytes(&bytes).unwrap();
    let readout = &decoded.readouts()[0];
    assert_eq!(readout.om(), OmKey::new(1, 61));
    assert_eq!(readout.kind(), LcKind::Slc);
    assert_eq!(readout.stamps()[0].chargecode(), 3641);
    let p = decoded.unpack()[&OmKey::new(1, 61)][0];
    assert!((p.charge - 1.000_563).abs() < 1e-5);
    assert_eq!(p.flags, PulseFlags::FADC);
}

#[test]
fn pmt_is_not_encoded() {
    let om = OmKey {
        string: 40,
        om: 12,
        pmt: 3,
    };
    let map = single(om, RecoPulse::new(100.0, 2.0, 4.0, PulseFlags::LC));
    let bytes = SuperDst::new(&map).unwrap().to_bytes().unwrap();
    let decoded = SuperDst::from_bytes(&bytes).unwrap();
    let keys: Vec<OmKey> = decoded.unpack().keys().copied().collect();
    assert_eq!(keys, [OmKey::new(40, 12)]);
}

#[test]
fn many_sensors_roundtrip() {
    let mut map = PulseMap::new();
    for string in 1..=80 {
        for om in [1, 30, 60, 61, 63] {
            let t = f64::from(string * 97 + om as i32 * 13);
            let hlc = (string + om as i32) % 2 == 0;
            let flags = if hlc { PulseFlags::LC } else { PulseFlags::FADC };
            map.insert(
                OmKey::new(string, om),
                vec![
                    RecoPulse::new(t, 0.8, 6.0, flags),
                    RecoPulse::new(t + 25.0, 3.5, 12.0, flags),
                ],
            );
        }
    }
    let dst = SuperDst::new(&map).unwrap();
    let bytes = dst.to_bytes().unwrap();
    let decoded = SuperDst::from_bytes(&bytes).unwrap();
    assert_eq!(decoded, dst);
    assert_eq!(decoded.to_bytes().unwrap(), bytes);

    let unpacked = decoded.unpack();
    assert_eq!(unpacked.len(), map.len());
    for (om, pulses) in &map {
        let got = &unpacked[om];
        assert_eq!(got.len(), 2, "{}", om);
        assert_eq!(got[0].time, pulses[0].time);
        assert_eq!(got[1].time, pulses[1].time);
    }

    let sizes = decoded.encoded_sizes();
    assert_eq!(sizes.len(), map.len());
    assert!(sizes.values().sum::<usize>() < bytes.len());
}
