//! End-to-end tests: algorithm nodes scheduled through a real chain.

use cadena_algos::{Deinterleave, Delay, DelaySpec, FrequencyJoin, Gain, RmsMonitor};
use std::sync::{Arc, Mutex};

use cadena_core::{
    Algorithm, AudioChain, AudioFormat, Domain, Interleaving, MemoryPools, NullPlatform,
    Platform, PoolBudgets, PoolKind, SampleType,
};

/// Records every warning the chain emits during build.
struct WarnLog(Arc<Mutex<Vec<String>>>);

impl Platform for WarnLog {
    fn core_clock_hz(&self) -> u32 {
        1
    }
    fn current_cycles(&self) -> u32 {
        0
    }
    fn elapsed_ms(&self) -> u64 {
        0
    }
    fn warning(&self, message: &str) {
        self.0.lock().unwrap().push(String::from(message));
    }
    fn control_lock(&self) {}
    fn control_unlock(&self) {}
    fn on_fatal_error(&self, _message: &str) {}
}

fn chain() -> AudioChain {
    AudioChain::new(
        MemoryPools::new(PoolBudgets { tcm: 0, int_ram: 256 * 1024, ext_ram: 0, dma: 0 }),
        Box::new(NullPlatform::new()),
    )
}

fn mono(ty: SampleType, elements: u32) -> AudioFormat {
    AudioFormat::new(1, 16000, ty, Interleaving::Interleaved, Domain::Time, elements).unwrap()
}

#[test]
fn gain_converts_fixed16_to_fixed32_bit_exactly() {
    let mut chain = chain();
    let a = chain.add_chunk("in", mono(SampleType::Fixed16, 16), 1, PoolKind::IntRam).unwrap();
    let b = chain.add_chunk("out", mono(SampleType::Fixed32, 16), 1, PoolKind::IntRam).unwrap();
    chain.add_node("gain", Box::new(Gain::new()), &[a], &[b]).unwrap();
    chain.build().unwrap();

    chain.chunk_mut(a).unwrap().set_sample_i16(0, 5, -1234);
    chain.data_in_out().unwrap();

    let raw = chain.chunk(b).unwrap().read_frame();
    let got = i32::from_le_bytes([raw[20], raw[21], raw[22], raw[23]]);
    // unity gain widens Q15 to Q31 by a pure shift
    assert_eq!(got, -1234 << 16);
    chain.teardown().unwrap();
}

#[test]
fn gain_parameter_update_reconfigures_the_node() {
    let mut chain = chain();
    let a = chain.add_chunk("in", mono(SampleType::Fixed16, 16), 1, PoolKind::IntRam).unwrap();
    let b = chain.add_chunk("out", mono(SampleType::Fixed16, 16), 1, PoolKind::IntRam).unwrap();
    let gain = chain.add_node("gain", Box::new(Gain::new()), &[a], &[b]).unwrap();
    chain.build().unwrap();

    // -20 dB is exactly a factor of 0.1
    chain.set_param(gain, "gain_db", -20.0).unwrap();
    chain.chunk_mut(a).unwrap().set_sample_i16(0, 0, 10000);
    chain.data_in_out().unwrap();
    let got = chain.chunk(b).unwrap().sample_i16(0, 0);
    assert!((i32::from(got) - 1000).abs() <= 1, "got {got}");
}

#[test]
fn delay_shifts_a_stream_across_periods() {
    let mut chain = chain();
    let fmt = mono(SampleType::Fixed16, 160);
    let a = chain.add_chunk("dry", fmt, 1, PoolKind::IntRam).unwrap();
    let b = chain.add_chunk("wet", fmt, 1, PoolKind::IntRam).unwrap();
    chain
        .add_node(
            "delay",
            Box::new(Delay::new(DelaySpec::Samples(10), PoolKind::IntRam)),
            &[a],
            &[b],
        )
        .unwrap();
    chain.build().unwrap();

    for el in 0..160 {
        let v = i16::try_from(el).unwrap();
        chain.chunk_mut(a).unwrap().set_sample_i16(0, el, v);
    }
    chain.data_in_out().unwrap();
    {
        let wet = chain.chunk(b).unwrap();
        // first 10 samples are the ring's silence fill
        assert_eq!(wet.sample_i16(0, 0), 0);
        assert_eq!(wet.sample_i16(0, 9), 0);
        assert_eq!(wet.sample_i16(0, 10), 0);
        assert_eq!(wet.sample_i16(0, 159), 149);
    }

    for el in 0..160 {
        let v = i16::try_from(1000 + el).unwrap();
        chain.chunk_mut(a).unwrap().set_sample_i16(0, el, v);
    }
    chain.data_in_out().unwrap();
    {
        let wet = chain.chunk(b).unwrap();
        // the tail of the first frame crosses the period boundary
        assert_eq!(wet.sample_i16(0, 0), 150);
        assert_eq!(wet.sample_i16(0, 9), 159);
        assert_eq!(wet.sample_i16(0, 10), 1000);
        assert_eq!(wet.sample_i16(0, 159), 1149);
    }

    chain.teardown().unwrap();
    assert_eq!(chain.pools().bytes_in_use(PoolKind::IntRam), 0);
}

#[test]
fn full_period_delay_replays_the_previous_frame() {
    // 0.010 s at 16 kHz is exactly one 160-sample period
    let mut chain = chain();
    let fmt = AudioFormat::new(
        1,
        16000,
        SampleType::Fixed16,
        Interleaving::NonInterleaved,
        Domain::Time,
        160,
    )
    .unwrap();
    let a = chain.add_chunk("dry", fmt, 1, PoolKind::IntRam).unwrap();
    let b = chain.add_chunk("wet", fmt, 1, PoolKind::IntRam).unwrap();
    chain
        .add_node(
            "delay",
            Box::new(Delay::new(DelaySpec::Seconds(0.010), PoolKind::IntRam)),
            &[a],
            &[b],
        )
        .unwrap();
    chain.build().unwrap();

    for el in 0..160 {
        let v = i16::try_from(el + 1).unwrap();
        chain.chunk_mut(a).unwrap().set_sample_i16(0, el, v);
    }
    chain.data_in_out().unwrap();
    for el in 0..160 {
        assert_eq!(chain.chunk(b).unwrap().sample_i16(0, el), 0);
    }

    for el in 0..160 {
        chain.chunk_mut(a).unwrap().set_sample_i16(0, el, -1);
    }
    chain.data_in_out().unwrap();
    for el in 0..160 {
        let v = i16::try_from(el + 1).unwrap();
        assert_eq!(chain.chunk(b).unwrap().sample_i16(0, el), v);
    }
    chain.teardown().unwrap();
}

#[test]
fn deinterleave_routes_channel_groups_in_port_order() {
    let mut chain = chain();
    let input = AudioFormat::new(
        4,
        16000,
        SampleType::Fixed16,
        Interleaving::Interleaved,
        Domain::Time,
        8,
    )
    .unwrap();
    let head = AudioFormat::new(
        1,
        16000,
        SampleType::Fixed16,
        Interleaving::NonInterleaved,
        Domain::Time,
        8,
    )
    .unwrap();
    let tail = AudioFormat::new(
        3,
        16000,
        SampleType::Fixed16,
        Interleaving::NonInterleaved,
        Domain::Time,
        8,
    )
    .unwrap();
    let all = chain.add_chunk("all", input, 1, PoolKind::IntRam).unwrap();
    let first = chain.add_chunk("first", head, 1, PoolKind::IntRam).unwrap();
    let rest = chain.add_chunk("rest", tail, 1, PoolKind::IntRam).unwrap();
    chain.add_node("split", Box::new(Deinterleave::new()), &[all], &[first, rest]).unwrap();
    chain.build().unwrap();

    for ch in 0..4 {
        for el in 0..8 {
            let v = i16::try_from(ch * 100 + el).unwrap();
            chain.chunk_mut(all).unwrap().set_sample_i16(ch, el, v);
        }
    }
    chain.data_in_out().unwrap();

    assert_eq!(chain.chunk(first).unwrap().sample_i16(0, 3), 3);
    assert_eq!(chain.chunk(rest).unwrap().sample_i16(0, 3), 103);
    assert_eq!(chain.chunk(rest).unwrap().sample_i16(2, 7), 307);
}

#[test]
fn fjoin_concatenates_bands_and_warns_on_surplus_width() {
    let mut chain = chain();
    let band = AudioFormat::new(
        1,
        16000,
        SampleType::Float32,
        Interleaving::NonInterleaved,
        Domain::Frequency,
        16,
    )
    .unwrap();
    let wide = AudioFormat::new(
        1,
        16000,
        SampleType::Float32,
        Interleaving::NonInterleaved,
        Domain::Frequency,
        40,
    )
    .unwrap();
    let low = chain.add_chunk("low", band, 1, PoolKind::IntRam).unwrap();
    let high = chain.add_chunk("high", band, 1, PoolKind::IntRam).unwrap();
    let full = chain.add_chunk("full", wide, 1, PoolKind::IntRam).unwrap();
    chain.add_node("join", Box::new(FrequencyJoin::new()), &[low, high], &[full]).unwrap();
    assert_eq!(chain.build().unwrap().len(), 1);

    chain.chunk_mut(low).unwrap().set_sample_f32(0, 3, 1.5);
    chain.chunk_mut(high).unwrap().set_sample_f32(0, 2, 2.5);
    chain.data_in_out().unwrap();

    let out = chain.chunk(full).unwrap();
    assert_eq!(out.sample_f32(0, 3), 1.5);
    assert_eq!(out.sample_f32(0, 18), 2.5);
    // bins past the supplied bands stay silent
    assert_eq!(out.sample_f32(0, 38), 0.0);
}

#[test]
fn build_forwards_band_warnings_to_the_platform() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let mut chain = AudioChain::new(
        MemoryPools::new(PoolBudgets { tcm: 0, int_ram: 256 * 1024, ext_ram: 0, dma: 0 }),
        Box::new(WarnLog(Arc::clone(&log))),
    );
    let band = AudioFormat::new(
        1,
        16000,
        SampleType::Float32,
        Interleaving::NonInterleaved,
        Domain::Frequency,
        16,
    )
    .unwrap();
    let wide = AudioFormat::new(
        1,
        16000,
        SampleType::Float32,
        Interleaving::NonInterleaved,
        Domain::Frequency,
        40,
    )
    .unwrap();
    let low = chain.add_chunk("low", band, 1, PoolKind::IntRam).unwrap();
    let high = chain.add_chunk("high", band, 1, PoolKind::IntRam).unwrap();
    let full = chain.add_chunk("full", wide, 1, PoolKind::IntRam).unwrap();
    chain.add_node("join", Box::new(FrequencyJoin::new()), &[low, high], &[full]).unwrap();
    chain.build().unwrap();

    let log = log.lock().unwrap();
    assert_eq!(log.len(), 1);
    assert!(log[0].contains("fjoin"), "{}", log[0]);
}

#[test]
fn gain_feeds_a_level_meter() {
    let mut chain = chain();
    let a = chain.add_chunk("pcm", mono(SampleType::Fixed16, 160), 1, PoolKind::IntRam).unwrap();
    let b = chain.add_chunk("f32", mono(SampleType::Float32, 160), 1, PoolKind::IntRam).unwrap();
    let (mut rms, handle) = RmsMonitor::new();
    rms.set_param("time_constant_ms", 0.0).unwrap();
    rms.set_param("window_frames", 1.0).unwrap();
    chain.add_node("gain", Box::new(Gain::new()), &[a], &[b]).unwrap();
    chain.add_node("rms", Box::new(rms), &[b], &[]).unwrap();
    chain.build().unwrap();

    // DC at 8192/32768 = 0.25 full scale
    for el in 0..160 {
        chain.chunk_mut(a).unwrap().set_sample_i16(0, el, 8192);
    }
    chain.data_in_out().unwrap();
    assert!(chain.process().unwrap() >= 1);
    assert_eq!(chain.control().unwrap(), 1);
    assert!((handle.level(0) - 0.25).abs() < 1.0e-6);
    assert!((handle.level_db(0) - -12.041_2).abs() < 1.0e-3);
}
