//! Throughput of the conversion kernels and a full scheduler period.

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use cadena_core::capability::{Capabilities, ChunkConsistency, PortCountSet, PortRequirements};
use cadena_core::{
    Algorithm, AudioChain, AudioFormat, Domain, EngineError, FormatConverter, Interleaving,
    MemoryPools, NodeContext, NodeIo, NullPlatform, PoolBudgets, PoolKind, Readiness, SampleType,
};

fn stereo(ty: SampleType) -> AudioFormat {
    AudioFormat::new(2, 48000, ty, Interleaving::Interleaved, Domain::Time, 480).unwrap()
}

fn bench_converters(c: &mut Criterion) {
    let i16_fmt = stereo(SampleType::Fixed16);
    let f32_fmt = stereo(SampleType::Float32);
    let alaw_fmt = stereo(SampleType::G711Alaw);

    let src: Vec<u8> = (0..i16_fmt.frame_bytes()).map(|i| (i * 7) as u8).collect();

    let to_float = FormatConverter::new(&i16_fmt, &f32_fmt).unwrap();
    let mut float_out = vec![0u8; f32_fmt.frame_bytes()];
    c.bench_function("convert_i16_to_f32_960", |b| {
        b.iter(|| to_float.convert(black_box(&src), black_box(&mut float_out)));
    });

    let to_alaw = FormatConverter::new(&i16_fmt, &alaw_fmt).unwrap();
    let mut alaw_out = vec![0u8; alaw_fmt.frame_bytes()];
    c.bench_function("convert_i16_to_alaw_960", |b| {
        b.iter(|| to_alaw.convert(black_box(&src), black_box(&mut alaw_out)));
    });

    let mut gained = FormatConverter::new(&i16_fmt, &i16_fmt).unwrap();
    gained.set_gain(false, 0.5);
    let mut gain_out = vec![0u8; i16_fmt.frame_bytes()];
    c.bench_function("convert_i16_gain_960", |b| {
        b.iter(|| gained.convert(black_box(&src), black_box(&mut gain_out)));
    });
}

static PASS_CAPS: Capabilities = Capabilities {
    name: "pass",
    inputs: PortRequirements::any(PortCountSet::ONE),
    outputs: PortRequirements::any(PortCountSet::ONE),
    consistency: ChunkConsistency::STRICT,
};

static SRC_CAPS: Capabilities = Capabilities {
    name: "src",
    inputs: PortRequirements::none(),
    outputs: PortRequirements::any(PortCountSet::ONE),
    consistency: ChunkConsistency::NONE,
};

struct Forward;

impl Algorithm for Forward {
    fn capabilities(&self) -> &'static Capabilities {
        &PASS_CAPS
    }

    fn init(&mut self, _cx: &mut NodeContext<'_>) -> Result<(), EngineError> {
        Ok(())
    }

    fn data_in_out(&mut self, _io: &mut NodeIo<'_, '_>) -> Result<Readiness, EngineError> {
        Ok(Readiness::process())
    }

    fn process(&mut self, io: &mut NodeIo<'_, '_>) -> Result<Readiness, EngineError> {
        let src = io.inputs[0].read_frame().to_vec();
        io.outputs[0].write_frame().copy_from_slice(&src);
        Ok(Readiness::none())
    }

    fn deinit(&mut self) {}
}

struct Silence;

impl Algorithm for Silence {
    fn capabilities(&self) -> &'static Capabilities {
        &SRC_CAPS
    }

    fn init(&mut self, _cx: &mut NodeContext<'_>) -> Result<(), EngineError> {
        Ok(())
    }

    fn data_in_out(&mut self, io: &mut NodeIo<'_, '_>) -> Result<Readiness, EngineError> {
        io.outputs[0].fill_silence();
        Ok(Readiness::none())
    }

    fn deinit(&mut self) {}
}

fn bench_chain_period(c: &mut Criterion) {
    let mut chain = AudioChain::new(
        MemoryPools::new(PoolBudgets { tcm: 0, int_ram: 256 * 1024, ext_ram: 0, dma: 0 }),
        Box::new(NullPlatform::new()),
    );
    let fmt = stereo(SampleType::Fixed16);
    let a = chain.add_chunk("a", fmt, 1, PoolKind::IntRam).unwrap();
    let b = chain.add_chunk("b", fmt, 1, PoolKind::IntRam).unwrap();
    let d = chain.add_chunk("c", fmt, 1, PoolKind::IntRam).unwrap();
    chain.add_node("src", Box::new(Silence), &[], &[a]).unwrap();
    chain.add_node("hop1", Box::new(Forward), &[a], &[b]).unwrap();
    chain.add_node("hop2", Box::new(Forward), &[b], &[d]).unwrap();
    chain.build().unwrap();

    c.bench_function("chain_period_3_nodes", |bench| {
        bench.iter(|| {
            chain.data_in_out().unwrap();
            chain.process().unwrap();
        });
    });
}

criterion_group!(benches, bench_converters, bench_chain_period);
criterion_main!(benches);
