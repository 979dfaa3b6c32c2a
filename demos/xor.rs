use stagefit::data::builtin;
use stagefit::{
    ActivationFunction, ClassifierHooks, Device, FitConfig, LoaderOptions, LossType,
    MemoryCheckpointStore, MetricsConfig, Sgd, StageController,
};

fn main() -> stagefit::Result<()> {
    let train = builtin::xor()?;
    let valid = builtin::xor()?;

    let hooks = ClassifierHooks::build(
        2,
        2,
        &[4],
        ActivationFunction::Tanh,
        Sgd::new(0.5).with_momentum(0.9),
        LossType::CrossEntropy,
        Some(&MetricsConfig::default()),
        42,
    )?;

    let store = MemoryCheckpointStore::new(1);
    let config = FitConfig::new(200).with_checkpoint_interval_minutes(0.0);
    let mut controller = StageController::new(hooks, Some(Box::new(store.clone())), config, Device::Cpu);

    let loader = LoaderOptions::default().with_batch_size(4);
    let report = controller.fit(&train, &valid, &loader)?;

    for summary in report.summaries.iter().step_by(20) {
        println!("{summary}");
    }

    for sample in train.samples() {
        let class = controller.hooks().predict(&sample.features)?;
        println!("Input: {:?} -> class {class} (expected {})", sample.features, sample.label);
    }
    println!("epoch-end checkpoints kept: {}", store.epoch_end_records().len());
    Ok(())
}
