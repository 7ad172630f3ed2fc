mod test_observer_pipeline;
