mod orphan_transfer_case;
