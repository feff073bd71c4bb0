mod acknowledgement_case;
mod backpressure_case;
mod keep_alive_case;
