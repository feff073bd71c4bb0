mod sample_completion_case;
mod trigger_filter_case;
